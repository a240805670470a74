use rspotify::{AuthCodeSpotify, Credentials, OAuth, prelude::*, scopes};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Authorization URL the user opens to grant playlist read access.
///
/// Only the client id is needed here; the secret stays with the relay.
pub fn authorize_url(config: &Config) -> Result<String> {
    if config.spotify_client_id.is_empty() {
        return Err(AppError::Config("SPOTIFY_CLIENT_ID not set".into()));
    }

    let creds = Credentials::new(&config.spotify_client_id, "");
    let oauth = OAuth {
        redirect_uri: config.spotify_redirect_uri.clone(),
        scopes: scopes!("playlist-read-private", "playlist-read-collaborative"),
        ..Default::default()
    };

    AuthCodeSpotify::new(creds, oauth)
        .get_authorize_url(false)
        .map_err(|e| AppError::Config(format!("Failed to build authorize URL: {}", e)))
}

/// Pull the authorization code out of the URL the provider redirected to.
pub fn parse_authorization_code(redirect_url: &str) -> Result<String> {
    let redirect_url = redirect_url.trim();
    if redirect_url.is_empty() {
        return Err(AppError::auth("Auth cancelled"));
    }

    let url = Url::parse(redirect_url)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid redirect URL: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => return Err(AppError::auth(value.into_owned())),
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| AppError::auth("No authorization code received"))
}
