pub mod broker;
pub mod models;

pub use broker::{RelayTokenBroker, SpotifyTokenBroker, TokenBroker};
pub use models::{AccessToken, ErrorBody};
