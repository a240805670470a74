use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error};

use crate::auth::ErrorBody;
use crate::auth::broker::{CODE_REQUIRED, REFRESH_TOKEN_REQUIRED};
use crate::auth::models::{AccessToken, RefreshTokenRequest, TokenExchangeRequest};
use crate::error::AppError;
use crate::relay::AppState;
use crate::spotify::{SourceCatalog, Track};

/// Failure reply: `{error, details}` with an HTTP status.
#[derive(Debug)]
pub struct RelayError {
    status: StatusCode,
    body: ErrorBody,
}

impl RelayError {
    fn new(status: StatusCode, error: &str, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                details,
            },
        }
    }

    /// Missing input becomes a 400 with the validation message; anything
    /// else is reported under `context` with `fallback` status unless the
    /// upstream status is known and `forward_status` is set.
    fn from_app_error(
        err: AppError,
        context: &str,
        fallback: StatusCode,
        forward_status: bool,
    ) -> Self {
        if let AppError::InvalidRequest(msg) = &err {
            return Self::new(StatusCode::BAD_REQUEST, msg, None);
        }

        error!("{}: {}", context, err);

        let status = err
            .status()
            .filter(|_| forward_status)
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(fallback);
        let details = match err {
            AppError::Auth { details, .. } | AppError::Upstream { details, .. } => details,
            other => other.to_string(),
        };

        Self::new(status, context, Some(details))
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// An unreadable body counts as a missing field.
fn required_body<T>(
    body: Result<Json<T>, JsonRejection>,
    message: &str,
) -> Result<T, RelayError> {
    body.map(|Json(request)| request).map_err(|rejection| {
        debug!("Rejected token request body: {}", rejection);
        RelayError::new(StatusCode::BAD_REQUEST, message, None)
    })
}

fn bearer_token(headers: &HeaderMap) -> Result<String, RelayError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_whitespace().nth(1))
        .map(str::to_string)
        .ok_or_else(|| {
            RelayError::new(StatusCode::UNAUTHORIZED, "Authorization header missing", None)
        })
}

/// POST /token-exchange
pub async fn token_exchange(
    State(state): State<AppState>,
    body: Result<Json<TokenExchangeRequest>, JsonRejection>,
) -> Result<Json<AccessToken>, RelayError> {
    let code = required_body(body, CODE_REQUIRED)?.code.unwrap_or_default();

    state
        .broker
        .exchange_code(&code)
        .await
        .map(Json)
        .map_err(|e| {
            RelayError::from_app_error(
                e,
                "Failed to exchange authorization code",
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
            )
        })
}

/// POST /refresh-token
pub async fn refresh_token(
    State(state): State<AppState>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<AccessToken>, RelayError> {
    let refresh_token = required_body(body, REFRESH_TOKEN_REQUIRED)?
        .refresh_token
        .unwrap_or_default();

    state
        .broker
        .refresh(&refresh_token)
        .await
        .map(Json)
        .map_err(|e| {
            RelayError::from_app_error(
                e,
                "Failed to refresh token",
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
            )
        })
}

/// GET /playlists: the source listing, passed through untouched.
pub async fn playlists(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, RelayError> {
    let token = bearer_token(&headers)?;

    state
        .catalog
        .get_raw(&state.catalog.playlists_url(), &token)
        .await
        .map(Json)
        .map_err(|e| {
            RelayError::from_app_error(
                e,
                "Failed to fetch playlists",
                StatusCode::INTERNAL_SERVER_ERROR,
                true,
            )
        })
}

/// GET /playlists/:playlist_id/tracks: every page, flattened.
pub async fn playlist_tracks(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Track>>, RelayError> {
    let token = bearer_token(&headers)?;

    state
        .catalog
        .list_tracks(&playlist_id, &token)
        .await
        .map(Json)
        .map_err(|e| {
            RelayError::from_app_error(
                e,
                "Failed to fetch playlist tracks",
                StatusCode::INTERNAL_SERVER_ERROR,
                true,
            )
        })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
