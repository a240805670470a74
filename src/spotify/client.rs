use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::spotify::models::{PageDto, Playlist, PlaylistDto, PlaylistItemDto, Track};

const PLAYLIST_PAGE_LIMIT: u32 = 50;
const TRACK_PAGE_LIMIT: u32 = 100;

/// Read access to the source service's playlists.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn list_playlists(&self, token: &str) -> Result<Vec<Playlist>>;

    /// Every track of the playlist, in source order, across all pages.
    async fn list_tracks(&self, playlist_id: &str, token: &str) -> Result<Vec<Track>>;
}

#[derive(Clone)]
pub struct SpotifyClient {
    http_client: Client,
    api_base: String,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.spotify_api_base)
    }

    pub fn with_base_url(api_base: &str) -> Self {
        Self {
            http_client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn playlists_url(&self) -> String {
        format!("{}/me/playlists?limit={}", self.api_base, PLAYLIST_PAGE_LIMIT)
    }

    pub fn tracks_url(&self, playlist_id: &str) -> String {
        format!(
            "{}/playlists/{}/tracks?limit={}",
            self.api_base,
            urlencoding::encode(playlist_id),
            TRACK_PAGE_LIMIT
        )
    }

    /// Fetch one URL and return the body untouched.
    pub async fn get_raw(&self, url: &str, token: &str) -> Result<Value> {
        self.get_json(url, token).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T> {
        if token.is_empty() {
            return Err(AppError::InvalidRequest("Access token is required".into()));
        }

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Follow `next` links from `first_url` until a page has none, mapping each
    /// page's items as it arrives.
    async fn collect_pages<D, T, F>(&self, first_url: String, token: &str, mut map: F) -> Result<Vec<T>>
    where
        D: DeserializeOwned,
        F: FnMut(D) -> T,
    {
        let mut items = Vec::new();
        let mut next_url = Some(first_url);
        let mut pages = 0usize;

        while let Some(url) = next_url.take() {
            let page: PageDto<D> = self.get_json(&url, token).await?;
            pages += 1;
            let page_items = page.items.unwrap_or_default();
            debug!("Fetched page {} with {} items", pages, page_items.len());

            items.extend(page_items.into_iter().map(&mut map));
            next_url = page.next.filter(|next| !next.is_empty());
        }

        Ok(items)
    }
}

#[async_trait]
impl SourceCatalog for SpotifyClient {
    async fn list_playlists(&self, token: &str) -> Result<Vec<Playlist>> {
        let playlists = self
            .collect_pages(self.playlists_url(), token, |dto: PlaylistDto| {
                Playlist::from(dto)
            })
            .await?;

        info!("Found {} user playlists", playlists.len());
        Ok(playlists)
    }

    async fn list_tracks(&self, playlist_id: &str, token: &str) -> Result<Vec<Track>> {
        if playlist_id.is_empty() {
            return Err(AppError::InvalidRequest("Playlist ID is required".into()));
        }

        let tracks = self
            .collect_pages(self.tracks_url(playlist_id), token, |item: PlaylistItemDto| {
                // Removed or unavailable items come back with a null track; they
                // still count as entries of the playlist.
                Track::from(item.track.unwrap_or_default())
            })
            .await?;

        info!("Fetched {} tracks from playlist {}", tracks.len(), playlist_id);
        Ok(tracks)
    }
}

/// Turn a non-2xx source response into an error carrying its status.
pub(crate) async fn upstream_error(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let details = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error_description"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            }
        });

    if status == StatusCode::UNAUTHORIZED {
        AppError::Auth {
            status: status.as_u16(),
            details,
        }
    } else {
        AppError::Upstream {
            status: status.as_u16(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_built_from_base() {
        let client = SpotifyClient::with_base_url("http://localhost:9999/v1/");

        assert_eq!(
            client.playlists_url(),
            "http://localhost:9999/v1/me/playlists?limit=50"
        );
        assert_eq!(
            client.tracks_url("37i9dQZF1E8NC99vGqLsaH"),
            "http://localhost:9999/v1/playlists/37i9dQZF1E8NC99vGqLsaH/tracks?limit=100"
        );
    }

    #[tokio::test]
    async fn test_empty_token_rejected_before_network() {
        // Nothing listens on port 9; an attempted request would surface as Http.
        let client = SpotifyClient::with_base_url("http://127.0.0.1:9/v1");

        let err = client.list_tracks("abc", "").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let err = client.list_tracks("", "token").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
