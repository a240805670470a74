//! Shared helpers: a stand-in for the source service's Web API and token
//! endpoint, served on an ephemeral local port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use spotify2ytmusic::Config;

pub const GOOD_TOKEN: &str = "good-token";

#[derive(Clone)]
struct FakeState {
    base: String,
    page_sizes: Arc<Vec<usize>>,
    hits: Arc<AtomicUsize>,
}

/// Running fake upstream. Every request it receives is counted.
pub struct FakeSpotify {
    pub base: String,
    hits: Arc<AtomicUsize>,
}

impl FakeSpotify {
    /// Start a server whose playlists have one page per entry of `page_sizes`.
    pub async fn start(page_sizes: Vec<usize>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake upstream");
        let base = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));

        let state = FakeState {
            base: base.clone(),
            page_sizes: Arc::new(page_sizes),
            hits: hits.clone(),
        };

        let app = Router::new()
            .route("/v1/me/playlists", get(playlists))
            .route("/v1/playlists/:id/tracks", get(tracks))
            .route("/api/token", post(token))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base, hits }
    }

    pub fn api_base(&self) -> String {
        format!("{}/v1", self.base)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Relay-side configuration pointing at this server.
    pub fn config(&self) -> Config {
        let values: HashMap<&str, String> = HashMap::from([
            ("SPOTIFY_CLIENT_ID", "client-id".to_string()),
            ("SPOTIFY_CLIENT_SECRET", "client-secret".to_string()),
            ("SPOTIFY_API_BASE", self.api_base()),
            ("SPOTIFY_TOKEN_URL", format!("{}/api/token", self.base)),
        ]);
        Config::from_lookup(|key| values.get(key).cloned()).unwrap()
    }
}

fn authorized(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", GOOD_TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": { "status": 401, "message": "Invalid access token" } })),
    )
        .into_response()
}

async fn playlists(State(state): State<FakeState>, headers: axum::http::HeaderMap) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }

    let total: usize = state.page_sizes.iter().sum();
    Json(json!({
        "items": [
            { "id": "pl1", "name": "Road Trip", "tracks": { "total": total } },
            { "id": "pl2", "name": "Focus", "tracks": { "total": 0 },
              "images": [{ "url": "https://img.example/focus.jpg" }] }
        ],
        "next": null
    }))
    .into_response()
}

async fn tracks(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: axum::http::HeaderMap,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == "forbidden" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "status": 403, "message": "Insufficient client scope" } })),
        )
            .into_response();
    }

    if id == "with-gaps" {
        return Json(json!({
            "items": [
                { "track": { "id": "a", "name": "A", "artists": [{ "name": "Artist" }] } },
                { "track": null },
                { "track": { "id": "c", "name": "C", "artists": null, "album": { "images": null } } }
            ],
            "next": null
        }))
        .into_response();
    }

    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let size = state.page_sizes.get(page).copied().unwrap_or(0);

    let items: Vec<Value> = (0..size)
        .map(|i| {
            json!({
                "track": {
                    "id": format!("{}-{}", page, i),
                    "name": format!("Song {}-{}", page, i),
                    "artists": [{ "name": "Artist" }, { "name": "Guest" }],
                    "album": { "name": "Album", "images": [] },
                    "duration_ms": 200000,
                    "external_ids": { "isrc": format!("ISRC{}{}", page, i) }
                }
            })
        })
        .collect();

    let next = if page + 1 < state.page_sizes.len() {
        json!(format!(
            "{}/v1/playlists/{}/tracks?limit=100&page={}",
            state.base,
            id,
            page + 1
        ))
    } else {
        Value::Null
    };

    Json(json!({ "items": items, "next": next })).into_response()
}

async fn token(State(state): State<FakeState>, Form(form): Form<HashMap<String, String>>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some("good-code") => {
            Json(json!({
                "access_token": GOOD_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "refresh-1"
            }))
            .into_response()
        }
        Some("refresh_token") if form.get("refresh_token").map(String::as_str) == Some("refresh-1") => {
            Json(json!({
                "access_token": "refreshed-token",
                "token_type": "Bearer",
                "expires_in": 3600
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" })),
        )
            .into_response(),
    }
}

pub fn test_request(method: &str, uri: &str, body: Option<Value>, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
