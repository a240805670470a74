pub mod auth;
pub mod client;
pub mod models;

pub use client::{SourceCatalog, SpotifyClient};
pub use models::{Playlist, Track};
