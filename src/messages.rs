//! One-shot requests between the front end and the background components.
//!
//! Every request gets exactly one response; failures come back as the
//! `{error}` shape rather than as a Rust error.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::auth::{AccessToken, TokenBroker};
use crate::error::{AppError, Result};
use crate::spotify::auth::parse_authorization_code;
use crate::spotify::{Playlist, SourceCatalog, Track};
use crate::storage::{TokenStore, TransferHistory};
use crate::transfer::TransferRecord;
use crate::ytmusic::{MatchResult, PlaylistDestination};

const DESTINATION_UNAVAILABLE: &str = "YouTube Music tab not found";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// Finish the authorization redirect and store the resulting token.
    #[serde(rename_all = "camelCase")]
    SpotifyAuth { redirect_url: String },
    GetSpotifyPlaylists { token: String },
    #[serde(rename_all = "camelCase")]
    GetSpotifyPlaylistTracks { playlist_id: String, token: String },
    #[serde(rename_all = "camelCase")]
    YoutubeCreatePlaylist { playlist_name: String },
    #[serde(rename_all = "camelCase")]
    YoutubeSearchAndAdd { track: Track, playlist_name: String },
    SaveTransfer { transfer: TransferRecord },
    GetTransfers,
    ClearStorage,
}

impl Request {
    pub const TYPES: [&'static str; 8] = [
        "SPOTIFY_AUTH",
        "GET_SPOTIFY_PLAYLISTS",
        "GET_SPOTIFY_PLAYLIST_TRACKS",
        "YOUTUBE_CREATE_PLAYLIST",
        "YOUTUBE_SEARCH_AND_ADD",
        "SAVE_TRANSFER",
        "GET_TRANSFERS",
        "CLEAR_STORAGE",
    ];

    /// Decode a raw message, telling an unknown `type` apart from a bad
    /// payload.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !Self::TYPES.contains(&kind.as_str()) {
            return Err(AppError::UnknownRequestType(kind));
        }

        serde_json::from_value(value)
            .map_err(|e| AppError::InvalidRequest(format!("Malformed {} request: {}", kind, e)))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Auth {
        token: AccessToken,
        success: bool,
    },
    Playlists(Vec<Playlist>),
    Tracks(Vec<Track>),
    #[serde(rename_all = "camelCase")]
    PlaylistCreated {
        success: bool,
        playlist_id: String,
    },
    Match(MatchResult),
    Transfers(Vec<TransferRecord>),
    Success {
        success: bool,
    },
    Error {
        error: String,
    },
}

impl Response {
    fn ok() -> Self {
        Response::Success { success: true }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

impl From<AppError> for Response {
    fn from(err: AppError) -> Self {
        let error = match err {
            AppError::UnknownRequestType(_) => "Unknown request type".to_string(),
            other => other.to_string(),
        };
        Response::Error { error }
    }
}

/// Routes requests to the component that owns them.
pub struct Dispatcher<B, S, D> {
    broker: B,
    catalog: S,
    destination: Option<D>,
    tokens: TokenStore,
    history: TransferHistory,
}

impl<B, S, D> Dispatcher<B, S, D>
where
    B: TokenBroker,
    S: SourceCatalog,
    D: PlaylistDestination,
{
    pub fn new(
        broker: B,
        catalog: S,
        destination: Option<D>,
        tokens: TokenStore,
        history: TransferHistory,
    ) -> Self {
        Self {
            broker,
            catalog,
            destination,
            tokens,
            history,
        }
    }

    pub async fn dispatch(&mut self, request: Request) -> Response {
        match self.handle(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request failed: {}", e);
                e.into()
            }
        }
    }

    /// Decode and dispatch a raw JSON message; always yields one JSON reply.
    pub async fn dispatch_value(&mut self, message: Value) -> Value {
        let response = match Request::from_value(message) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => e.into(),
        };
        serde_json::to_value(&response)
            .unwrap_or_else(|e| json!({ "error": format!("Failed to encode response: {}", e) }))
    }

    async fn handle(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::SpotifyAuth { redirect_url } => {
                let code = parse_authorization_code(&redirect_url)?;
                let token = self.broker.exchange_code(&code).await?;
                let stored = self.tokens.save_spotify(token)?;
                Ok(Response::Auth {
                    token: stored.token,
                    success: true,
                })
            }
            Request::GetSpotifyPlaylists { token } => {
                Ok(Response::Playlists(self.catalog.list_playlists(&token).await?))
            }
            Request::GetSpotifyPlaylistTracks { playlist_id, token } => Ok(Response::Tracks(
                self.catalog.list_tracks(&playlist_id, &token).await?,
            )),
            Request::YoutubeCreatePlaylist { playlist_name } => {
                let destination = self.destination()?;
                let handle = destination.create_playlist(&playlist_name).await?;
                Ok(Response::PlaylistCreated {
                    success: true,
                    playlist_id: handle.id,
                })
            }
            Request::YoutubeSearchAndAdd {
                track,
                playlist_name,
            } => {
                let destination = self.destination()?;
                Ok(Response::Match(
                    destination.search_and_add(&track, &playlist_name).await,
                ))
            }
            Request::SaveTransfer { transfer } => {
                self.history.save(transfer)?;
                Ok(Response::ok())
            }
            Request::GetTransfers => Ok(Response::Transfers(self.history.list()?)),
            Request::ClearStorage => {
                self.history.clear()?;
                Ok(Response::ok())
            }
        }
    }

    fn destination(&mut self) -> Result<&mut D> {
        debug!("Routing request to destination");
        self.destination
            .as_mut()
            .ok_or_else(|| AppError::NotFound(DESTINATION_UNAVAILABLE.to_string()))
    }
}
