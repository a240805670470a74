use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{info, warn};

use crate::auth::models::{
    AccessToken, ErrorBody, ProviderErrorBody, RefreshTokenRequest, TokenExchangeRequest,
};
use crate::config::Config;
use crate::error::{AppError, Result};

pub const CODE_REQUIRED: &str = "Authorization code is required";
pub const REFRESH_TOKEN_REQUIRED: &str = "Refresh token is required";

/// Exchanges authorization codes and refresh tokens for access tokens.
///
/// Persisting the returned token is the caller's job.
#[async_trait]
pub trait TokenBroker: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken>;

    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken>;
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(message.to_string()));
    }
    Ok(())
}

/// Talks to the identity provider's token endpoint directly. Holds the
/// client secret, so only the relay should build one.
pub struct SpotifyTokenBroker {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyTokenBroker {
    pub fn new(config: &Config) -> Self {
        Self {
            http_client: Client::new(),
            token_url: config.spotify_token_url.clone(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<AccessToken> {
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let details = serde_json::from_str::<ProviderErrorBody>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or(body);
            warn!("Token endpoint rejected request ({}): {}", status, details);
            return Err(AppError::Auth { status, details });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::auth(format!("Failed to parse token response: {}", e)))
    }
}

#[async_trait]
impl TokenBroker for SpotifyTokenBroker {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        require(code, CODE_REQUIRED)?;

        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
            ])
            .await?;

        info!("Exchanged authorization code for access token");
        Ok(token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken> {
        require(refresh_token, REFRESH_TOKEN_REQUIRED)?;

        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        info!("Refreshed access token");
        Ok(token)
    }
}

/// Client-side broker: forwards to the relay, which holds the secret.
pub struct RelayTokenBroker {
    http_client: Client,
    relay_url: String,
}

impl RelayTokenBroker {
    pub fn new(config: &Config) -> Self {
        Self::with_relay_url(&config.relay_url)
    }

    pub fn with_relay_url(relay_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            relay_url: relay_url.trim_end_matches('/').to_string(),
        }
    }

    async fn parse(response: Response) -> Result<AccessToken> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body: Option<ErrorBody> = response.json().await.ok();
            let details = body
                .map(|b| match b.details {
                    Some(details) => format!("{}: {}", b.error, details),
                    None => b.error,
                })
                .unwrap_or_else(|| "relay returned no error body".to_string());
            return Err(AppError::Auth { status, details });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TokenBroker for RelayTokenBroker {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        require(code, CODE_REQUIRED)?;

        let response = self
            .http_client
            .post(format!("{}/token-exchange", self.relay_url))
            .json(&TokenExchangeRequest {
                code: Some(code.to_string()),
            })
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken> {
        require(refresh_token, REFRESH_TOKEN_REQUIRED)?;

        let response = self
            .http_client
            .post(format!("{}/refresh-token", self.relay_url))
            .json(&RefreshTokenRequest {
                refresh_token: Some(refresh_token.to_string()),
            })
            .send()
            .await?;

        Self::parse(response).await
    }
}
