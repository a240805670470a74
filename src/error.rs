use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed ({status}): {details}")]
    Auth { status: u16, details: String },

    #[error("Spotify API error ({status}): {details}")]
    Upstream { status: u16, details: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout { what: String, ms: u64 },

    #[error("Could not extract playlist ID")]
    IdExtractionFailed,

    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn auth(details: impl Into<String>) -> Self {
        AppError::Auth {
            status: 401,
            details: details.into(),
        }
    }

    /// Upstream HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Auth { status, .. } | AppError::Upstream { status, .. } => Some(*status),
            AppError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
