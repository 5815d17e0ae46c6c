//! HTTP and WebSocket surface.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/api/music/queue/add` | Request a song `{url}` |
//! | POST | `/api/music/queue/remove` | Remove `{url}` or `{position}` |
//! | GET | `/api/music/queue` | Queue snapshot |
//! | GET | `/api/music/queue/eta` | Time until the queue runs dry |
//! | POST | `/api/song/play` | Resume the head |
//! | POST | `/api/song/pause` | Pause the head |
//! | POST | `/api/song/skip` | Skip the head |
//! | POST | `/api/music/cache` | Resolve and cache `{url}` without queueing |
//! | GET | `/api/music/cache/{id}` | Cached entry by media id |
//! | POST | `/api/music/cache/cleanup` | Run a cache cleanup pass |
//! | GET | `/ws/playback` | Live head status (WebSocket) |

mod api;
mod ws;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::Jukebox;

pub use api::ApiResponse;

/// Shared state passed to all request handlers
pub type AppState = Arc<Jukebox>;

/// Build the router with every endpoint
pub fn router(jukebox: AppState) -> Router {
    Router::new()
        .route("/api/music/queue", get(api::list_queue))
        .route("/api/music/queue/add", post(api::add_to_queue))
        .route("/api/music/queue/remove", post(api::remove_from_queue))
        .route("/api/music/queue/eta", get(api::queue_eta))
        .route("/api/song/play", post(api::play))
        .route("/api/song/pause", post(api::pause))
        .route("/api/song/skip", post(api::skip))
        .route("/api/music/cache", post(api::cache_song))
        .route("/api/music/cache/cleanup", post(api::cleanup_cache))
        .route("/api/music/cache/{id}", get(api::get_cache_entry))
        .route("/ws/playback", get(ws::playback_socket))
        .with_state(jukebox)
}

/// Serve until Ctrl-C
pub async fn serve(jukebox: AppState, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(jukebox))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
    }
}
