pub mod auth;
pub mod config;
pub mod error;
pub mod messages;
pub mod relay;
pub mod spotify;
pub mod storage;
pub mod transfer;
pub mod ytmusic;

pub use auth::{AccessToken, RelayTokenBroker, SpotifyTokenBroker, TokenBroker};
pub use config::Config;
pub use error::{AppError, Result};
pub use messages::{Dispatcher, Request, Response};
pub use spotify::{Playlist, SourceCatalog, SpotifyClient, Track};
pub use storage::{FileStore, KeyValueStore, TokenStore, TransferHistory};
pub use transfer::{Progress, TransferOrchestrator, TransferRecord, TransferReport};
pub use ytmusic::{ChromeSurface, DestinationAutomator, MatchResult, PlaylistDestination};
