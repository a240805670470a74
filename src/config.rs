use std::path::PathBuf;

use crate::error::{AppError, Result};

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
const DEFAULT_RELAY_URL: &str = "http://localhost:3000";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_YTMUSIC_URL: &str = "https://music.youtube.com/";
const APP_DIR: &str = "spotify2ytmusic";

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: String,
    /// Only the relay holds the secret.
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub spotify_api_base: String,
    pub spotify_token_url: String,
    pub relay_url: String,
    pub relay_port: u16,
    pub relay_allowed_origin: Option<String>,
    pub ytmusic_url: String,
    pub store_path: PathBuf,
    pub browser_profile_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let relay_port = match get("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| AppError::Config(format!("PORT is not a valid port: {}", port)))?,
            None => DEFAULT_PORT,
        };

        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Ok(Self {
            spotify_client_id: get("SPOTIFY_CLIENT_ID").unwrap_or_default(),
            spotify_client_secret: get("SPOTIFY_CLIENT_SECRET").unwrap_or_default(),
            spotify_redirect_uri: get("SPOTIFY_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            spotify_api_base: get("SPOTIFY_API_BASE")
                .unwrap_or_else(|| DEFAULT_SPOTIFY_API_BASE.to_string()),
            spotify_token_url: get("SPOTIFY_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_SPOTIFY_TOKEN_URL.to_string()),
            relay_url: get("RELAY_URL").unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            relay_port,
            relay_allowed_origin: get("RELAY_ALLOWED_ORIGIN"),
            ytmusic_url: get("YTMUSIC_URL").unwrap_or_else(|| DEFAULT_YTMUSIC_URL.to_string()),
            store_path: get("STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("store.json")),
            browser_profile_dir: get("BROWSER_PROFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("chrome-profile")),
        })
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.spotify_client_id.is_empty() {
            missing.push("SPOTIFY_CLIENT_ID".to_string());
        }

        missing
    }

    pub fn get_missing_relay_config(&self) -> Vec<String> {
        let mut missing = self.get_missing_config();

        if self.spotify_client_secret.is_empty() {
            missing.push("SPOTIFY_CLIENT_SECRET".to_string());
        }

        missing
    }
}
