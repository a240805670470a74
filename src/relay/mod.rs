//! HTTP relay that keeps the client secret off the client.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{SpotifyTokenBroker, TokenBroker};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::spotify::SpotifyClient;

/// Shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<dyn TokenBroker>,
    pub catalog: Arc<SpotifyClient>,
}

impl AppState {
    pub fn new(broker: Arc<dyn TokenBroker>, catalog: Arc<SpotifyClient>) -> Self {
        Self { broker, catalog }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(SpotifyTokenBroker::new(config)),
            Arc::new(SpotifyClient::new(config)),
        )
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/token-exchange", post(handlers::token_exchange))
        .route("/refresh-token", post(handlers::refresh_token))
        .route("/playlists", get(handlers::playlists))
        .route("/playlists/:playlist_id/tracks", get(handlers::playlist_tracks))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Any origin unless one is configured.
pub fn cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer> {
    let origin = match allowed_origin {
        Some(origin) => AllowOrigin::exact(HeaderValue::from_str(origin).map_err(|_| {
            AppError::Config(format!("Invalid RELAY_ALLOWED_ORIGIN: {}", origin))
        })?),
        None => AllowOrigin::from(Any),
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

pub async fn serve(config: &Config) -> Result<()> {
    let missing = config.get_missing_relay_config();
    if !missing.is_empty() {
        return Err(AppError::Config(format!(
            "Missing relay configuration: {}",
            missing.join(", ")
        )));
    }

    let app = build_router(AppState::from_config(config))
        .layer(cors_layer(config.relay_allowed_origin.as_deref())?)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.relay_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Relay listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
