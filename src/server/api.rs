//! JSON API handlers.

use std::future::Future;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use super::AppState;
use crate::core::{MusicError, QueueTarget};
use crate::domain::MediaId;

const INTERNAL_ERROR: &str = "Internal error occurred!";

/// Body of every API response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => self.data = Some(value),
            Err(e) => error!("Failed to serialize response data: {}", e),
        }
        self
    }
}

fn reply(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}

fn failure(e: &MusicError) -> Response {
    if e.is_client_error() {
        reply(StatusCode::BAD_REQUEST, ApiResponse::fail(e.to_string()))
    } else if e.is_soft_block() {
        reply(StatusCode::FORBIDDEN, ApiResponse::fail(e.to_string()))
    } else {
        error!("Request failed: {}", e);
        reply(StatusCode::INTERNAL_SERVER_ERROR, ApiResponse::fail(INTERNAL_ERROR))
    }
}

/// Run `work` on its own task so it finishes even if the client goes away
async fn detached<T, F>(work: F) -> Result<Result<T, MusicError>, Response>
where
    T: Send + 'static,
    F: Future<Output = Result<T, MusicError>> + Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        error!("Request task failed: {}", e);
        reply(StatusCode::INTERNAL_SERVER_ERROR, ApiResponse::fail(INTERNAL_ERROR))
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct UrlRequest {
    url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RemoveRequest {
    url: Option<String>,
    position: Option<usize>,
}

// ==================== Queue ====================

pub(super) async fn add_to_queue(
    State(jukebox): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Response {
    let result = detached(async move { jukebox.add_to_queue(&request.url).await }).await;
    match result {
        Err(response) => response,
        Ok(Ok(outcome)) => reply(
            StatusCode::OK,
            ApiResponse::ok(outcome.message()).with_data(&outcome),
        ),
        Ok(Err(e)) => failure(&e),
    }
}

pub(super) async fn remove_from_queue(
    State(jukebox): State<AppState>,
    Json(request): Json<RemoveRequest>,
) -> Response {
    let target = match (request.url, request.position) {
        (Some(url), _) => QueueTarget::Url(url),
        (None, Some(position)) => QueueTarget::Position(position),
        (None, None) => {
            return reply(
                StatusCode::BAD_REQUEST,
                ApiResponse::fail("Either url or position is required"),
            )
        }
    };

    match jukebox.remove_from_queue(target).await {
        Ok(removed) => reply(
            StatusCode::OK,
            ApiResponse::ok(format!("Removed {} entries from queue", removed))
                .with_data(&json!({ "removed": removed })),
        ),
        Err(e) => failure(&e),
    }
}

pub(super) async fn list_queue(State(jukebox): State<AppState>) -> Response {
    let entries = jukebox.queue_entries().await;
    reply(
        StatusCode::OK,
        ApiResponse::ok(format!("{} entries in queue", entries.len())).with_data(&entries),
    )
}

pub(super) async fn queue_eta(State(jukebox): State<AppState>) -> Response {
    let seconds = jukebox.queue().queue_empty_in().await;
    let eta = jukebox.queue_empty_in_as_string().await;
    reply(
        StatusCode::OK,
        ApiResponse::ok(format!("Queue empty in {}", eta))
            .with_data(&json!({ "eta": eta, "seconds": seconds })),
    )
}

// ==================== Playback ====================

pub(super) async fn play(State(jukebox): State<AppState>) -> Response {
    let state = jukebox.play().await;
    reply(StatusCode::OK, ApiResponse::default().with_data(&state))
}

pub(super) async fn pause(State(jukebox): State<AppState>) -> Response {
    let state = jukebox.pause().await;
    reply(StatusCode::OK, ApiResponse::default().with_data(&state))
}

pub(super) async fn skip(State(jukebox): State<AppState>) -> Response {
    let next = jukebox.skip().await.and_then(|s| s.next);
    reply(StatusCode::OK, ApiResponse::default().with_data(&next))
}

// ==================== Cache ====================

pub(super) async fn cache_song(
    State(jukebox): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Response {
    let result = detached(async move { jukebox.cache_song(&request.url).await }).await;
    match result {
        Err(response) => response,
        Ok(Ok(entry)) => reply(
            StatusCode::OK,
            ApiResponse::ok(format!("Cached {} - {}", entry.artist, entry.title)).with_data(&entry),
        ),
        Ok(Err(e)) => failure(&e),
    }
}

pub(super) async fn get_cache_entry(
    State(jukebox): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let id: MediaId = match id.parse() {
        Ok(id) => id,
        Err(e) => return failure(&e),
    };

    match jukebox.get_cache_entry_by_id(&id).await {
        Some(entry) => reply(StatusCode::OK, ApiResponse::default().with_data(&entry)),
        None => reply(
            StatusCode::NOT_FOUND,
            ApiResponse::fail(format!("{} is not cached", id)),
        ),
    }
}

pub(super) async fn cleanup_cache(State(jukebox): State<AppState>) -> Response {
    let removed = jukebox.cleanup_cache().await;
    reply(
        StatusCode::OK,
        ApiResponse::ok(format!("Removed {} cache entries", removed))
            .with_data(&json!({ "removed": removed })),
    )
}
