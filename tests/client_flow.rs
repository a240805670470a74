//! Client-side components talking to a live relay over HTTP.

mod common;

use std::sync::Arc;

use spotify2ytmusic::auth::AccessToken;
use spotify2ytmusic::relay::{AppState, build_router};
use spotify2ytmusic::storage::MemoryStore;
use spotify2ytmusic::{
    AppError, KeyValueStore, RelayTokenBroker, SourceCatalog, SpotifyClient, SpotifyTokenBroker,
    TokenBroker, TokenStore,
};

use common::{FakeSpotify, GOOD_TOKEN};

async fn start_relay(fake: &FakeSpotify) -> String {
    let config = fake.config();
    let app = build_router(AppState::new(
        Arc::new(SpotifyTokenBroker::new(&config)),
        Arc::new(SpotifyClient::new(&config)),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    url
}

#[tokio::test]
async fn test_catalog_pagination_sums_pages() {
    let fake = FakeSpotify::start(vec![100, 100, 37]).await;
    let client = SpotifyClient::with_base_url(&fake.api_base());

    let tracks = client.list_tracks("pl1", GOOD_TOKEN).await.unwrap();

    assert_eq!(tracks.len(), 237);
    assert_eq!(tracks[100].source_id, "1-0");
    assert_eq!(tracks[100].isrc.as_deref(), Some("ISRC10"));
    assert_eq!(fake.hits(), 3);
}

#[tokio::test]
async fn test_unavailable_items_still_counted() {
    let fake = FakeSpotify::start(vec![]).await;
    let client = SpotifyClient::with_base_url(&fake.api_base());

    let tracks = client.list_tracks("with-gaps", GOOD_TOKEN).await.unwrap();

    assert_eq!(tracks.len(), 3);
    assert_eq!(tracks[0].title, "A");
    assert_eq!(tracks[1].title, "");
    assert_eq!(tracks[1].source_id, "");
    assert_eq!(tracks[2].title, "C");
    assert_eq!(tracks[2].artist, "");
}

#[tokio::test]
async fn test_catalog_lists_playlists() {
    let fake = FakeSpotify::start(vec![4]).await;
    let client = SpotifyClient::with_base_url(&fake.api_base());

    let playlists = client.list_playlists(GOOD_TOKEN).await.unwrap();

    assert_eq!(playlists.len(), 2);
    assert_eq!(playlists[0].name, "Road Trip");
    assert_eq!(playlists[0].track_count, 4);
    assert_eq!(
        playlists[1].image_url.as_deref(),
        Some("https://img.example/focus.jpg")
    );
}

#[tokio::test]
async fn test_catalog_bad_token_is_auth_error() {
    let fake = FakeSpotify::start(vec![1]).await;
    let client = SpotifyClient::with_base_url(&fake.api_base());

    let err = client.list_tracks("pl1", "expired").await.unwrap_err();

    assert!(matches!(err, AppError::Auth { status: 401, .. }));
}

#[tokio::test]
async fn test_relay_broker_exchanges_code() {
    let fake = FakeSpotify::start(vec![]).await;
    let relay = start_relay(&fake).await;
    let broker = RelayTokenBroker::with_relay_url(&relay);

    let token = broker.exchange_code("good-code").await.unwrap();
    assert_eq!(token.access_token, GOOD_TOKEN);
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));

    let err = broker.exchange_code("stale-code").await.unwrap_err();
    assert!(err.status().is_some());
}

#[tokio::test]
async fn test_expired_token_refreshed_through_relay() {
    let fake = FakeSpotify::start(vec![]).await;
    let relay = start_relay(&fake).await;
    let broker = RelayTokenBroker::with_relay_url(&relay);

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let tokens = TokenStore::new(store.clone());
    tokens
        .save_spotify(AccessToken {
            access_token: "old-token".to_string(),
            expires_in: 1,
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh-1".to_string()),
        })
        .unwrap();

    let access = tokens.spotify_access_token(&broker).await.unwrap();
    assert_eq!(access, "refreshed-token");

    // The provider omitted a new refresh value, so the old one is kept.
    let stored = tokens.spotify().unwrap().unwrap();
    assert_eq!(stored.token.refresh_token.as_deref(), Some("refresh-1"));
}
