use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::auth::{AccessToken, TokenBroker};
use crate::error::{AppError, Result};
use crate::storage::kv::KeyValueStore;

pub const SPOTIFY_TOKEN_KEY: &str = "spotifyToken";
pub const YOUTUBE_TOKEN_KEY: &str = "youtubeToken";

/// Refresh this long before the provider's stated expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(flatten)]
    pub token: AccessToken,
    pub obtained_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(token: AccessToken) -> Self {
        Self {
            token,
            obtained_at: Utc::now(),
        }
    }

    /// A zero `expires_in` means the provider gave no lifetime.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.token.expires_in == 0 {
            return false;
        }
        let lifetime = Duration::seconds(self.token.expires_in as i64 - EXPIRY_MARGIN_SECS);
        now >= self.obtained_at + lifetime
    }
}

/// Cached credentials for both services.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn spotify(&self) -> Result<Option<StoredToken>> {
        match self.store.get(SPOTIFY_TOKEN_KEY)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Overwrite the Spotify token. A refresh response usually omits the
    /// refresh value, so the previous one is carried over.
    pub fn save_spotify(&self, mut token: AccessToken) -> Result<StoredToken> {
        if token.refresh_token.is_none() {
            token.refresh_token = self.spotify()?.and_then(|t| t.token.refresh_token);
        }

        let stored = StoredToken::new(token);
        self.store
            .set(SPOTIFY_TOKEN_KEY, serde_json::to_value(&stored)?)?;
        Ok(stored)
    }

    /// Current access token, refreshed through `broker` when expired.
    pub async fn spotify_access_token(&self, broker: &dyn TokenBroker) -> Result<String> {
        let stored = self
            .spotify()?
            .ok_or_else(|| AppError::auth("Not logged in to Spotify"))?;

        if !stored.is_expired_at(Utc::now()) {
            return Ok(stored.token.access_token);
        }

        let refresh_token = stored
            .token
            .refresh_token
            .ok_or_else(|| AppError::auth("Spotify token expired; log in again"))?;

        info!("Spotify token expired, refreshing");
        let refreshed = broker.refresh(&refresh_token).await?;
        Ok(self.save_spotify(refreshed)?.token.access_token)
    }

    pub fn mark_youtube_signed_in(&self) -> Result<()> {
        self.store
            .set(YOUTUBE_TOKEN_KEY, json!({ "authenticated": true }))
    }

    pub fn youtube_signed_in(&self) -> Result<bool> {
        Ok(matches!(
            self.store.get(YOUTUBE_TOKEN_KEY)?,
            Some(value) if value["authenticated"] == true
        ))
    }

    pub fn clear(&self) -> Result<()> {
        self.store.set(SPOTIFY_TOKEN_KEY, Value::Null)?;
        self.store.set(YOUTUBE_TOKEN_KEY, Value::Null)
    }
}
