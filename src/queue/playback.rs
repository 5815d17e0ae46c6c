//! Playback controller: play, pause and skip on the queue head.
//!
//! Every operation on an empty queue is a logged no-op.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::manager::QueueManager;
use crate::domain::QueueEntry;

/// Playback state of the head entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn of(entry: &QueueEntry) -> Self {
        if entry.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }
}

/// State of the head, None when the queue is empty
pub fn state(queue: &QueueManager) -> Option<PlaybackState> {
    queue.head().map(PlaybackState::of)
}

/// Pause the head
pub fn pause(queue: &mut QueueManager) -> Option<PlaybackState> {
    let Some(head) = queue.head_mut() else {
        info!("Nothing to pause, queue is empty");
        return None;
    };
    head.paused = true;
    info!(id = %head.id(), "Paused: {} - {}", head.artist(), head.title());
    Some(PlaybackState::Paused)
}

/// Resume the head
pub fn play(queue: &mut QueueManager) -> Option<PlaybackState> {
    let Some(head) = queue.head_mut() else {
        info!("Nothing to play, queue is empty");
        return None;
    };
    head.paused = false;
    info!(id = %head.id(), "Resumed: {} - {}", head.artist(), head.title());
    Some(PlaybackState::Playing)
}

/// Drop the head and start the next entry, whatever its paused flag was.
///
/// Returns the skipped entry.
pub fn skip(queue: &mut QueueManager) -> Option<QueueEntry> {
    let Some(skipped) = queue.pop_head() else {
        info!("Nothing to skip, queue is empty");
        return None;
    };
    info!(id = %skipped.id(), "Skipped: {} - {}", skipped.artist(), skipped.title());

    if let Some(next) = queue.head_mut() {
        next.paused = false;
    }
    Some(skipped)
}
