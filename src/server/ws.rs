//! `/ws/playback`: pushes the queue head on connect and on every change.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use tracing::{debug, warn};

use super::AppState;

pub(super) async fn playback_socket(ws: WebSocketUpgrade, State(jukebox): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_playback_socket(socket, jukebox))
}

/// Manages a single WebSocket connection for playback status
async fn handle_playback_socket(mut socket: WebSocket, jukebox: AppState) {
    let (id, mut rx) = jukebox.subscribe().await;
    debug!(subscriber = %id, "Playback socket opened");

    loop {
        tokio::select! {
            status = rx.recv() => {
                let Some(status) = status else { break };
                if let Err(e) = socket.send(Message::Text(status.into())).await {
                    warn!(subscriber = %id, "Failed to send status update: {}", e);
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Outbound-only channel
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    jukebox.unsubscribe(&id);
    debug!(subscriber = %id, "Playback socket closed");
}
