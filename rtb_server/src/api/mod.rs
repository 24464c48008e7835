//! HTTP/WebSocket API for the Ride the Bus server.
//!
//! Commands go over plain HTTP and answer with the resulting session
//! snapshot. Every screen also holds a WebSocket that receives each committed
//! snapshot of its lobby.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: Middleware for CORS and request IDs
//! - **Actor Model**: Lobby state owned by one actor task per lobby
//!
//! # Modules
//!
//! - [`lobbies`]: Lobby commands (create, join, start, guess, hand out, close)
//! - [`websocket`]: Snapshot push channel
//! - [`request_id`]: Request correlation IDs
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                          - Health check
//! POST /api/lobbies                     - Open a lobby
//! GET  /api/lobbies/{code}              - Current snapshot
//! POST /api/lobbies/{code}/join         - Join or rejoin
//! POST /api/lobbies/{code}/start        - Host starts a ride
//! POST /api/lobbies/{code}/restart      - Host resets the game
//! POST /api/lobbies/{code}/choice       - Lock in a guess
//! POST /api/lobbies/{code}/distribute   - Hand out sips
//! POST /api/lobbies/{code}/tap          - Tap out after this round
//! POST /api/lobbies/{code}/close        - Host closes the lobby
//! GET  /api/lobbies/{code}/ws           - Snapshot push channel
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use rtb_server::api::{create_router, AppState};
//! use ride_the_bus::LobbyManager;
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let state = AppState::new(Arc::new(LobbyManager::default()));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is permissive; phones load the client from wherever the host serves it.

pub mod lobbies;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use ride_the_bus::{LobbyManager, SnapshotFeed};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// `feed` is the same manager seen through [`SnapshotFeed`]; the push channel
/// only ever talks to that.
#[derive(Clone)]
pub struct AppState {
    pub lobby_manager: Arc<LobbyManager>,
    pub feed: Arc<dyn SnapshotFeed>,
}

impl AppState {
    pub fn new(lobby_manager: Arc<LobbyManager>) -> Self {
        let feed: Arc<dyn SnapshotFeed> = lobby_manager.clone();
        Self {
            lobby_manager,
            feed,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/lobbies", post(lobbies::create_lobby))
        .route("/api/lobbies/{code}", get(lobbies::get_lobby))
        .route("/api/lobbies/{code}/join", post(lobbies::join_lobby))
        .route("/api/lobbies/{code}/start", post(lobbies::start_game))
        .route("/api/lobbies/{code}/restart", post(lobbies::restart_game))
        .route("/api/lobbies/{code}/choice", post(lobbies::submit_choice))
        .route("/api/lobbies/{code}/distribute", post(lobbies::submit_distribution))
        .route("/api/lobbies/{code}/tap", post(lobbies::request_tap_out))
        .route("/api/lobbies/{code}/close", post(lobbies::close_lobby))
        .route("/api/lobbies/{code}/ws", get(websocket::websocket_handler))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","version":"0.1.0","lobbies":3,"timestamp":"2026-10-17T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let lobbies = state.lobby_manager.lobby_count().await;

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "lobbies": lobbies,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
