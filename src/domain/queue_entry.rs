//! Queue entries: a cached song plus playback bookkeeping.

use serde::{Deserialize, Serialize};

use super::media_id::MediaId;
use super::song::CacheEntry;

/// One slot in the playback queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// The cached song, flattened into the same JSON object
    #[serde(flatten)]
    pub song: CacheEntry,

    /// Seconds already played
    #[serde(default)]
    pub play_time: f64,

    #[serde(default)]
    pub paused: bool,

    /// Filler from the backup playlist, excluded from wait estimates
    #[serde(default)]
    pub from_backup_playlist: bool,
}

impl QueueEntry {
    pub fn new(song: CacheEntry, play_time: f64, paused: bool, from_backup_playlist: bool) -> Self {
        Self {
            song,
            play_time,
            paused,
            from_backup_playlist,
        }
    }

    pub fn id(&self) -> &MediaId {
        &self.song.id
    }

    pub fn title(&self) -> &str {
        &self.song.title
    }

    pub fn artist(&self) -> &str {
        &self.song.artist
    }

    pub fn duration(&self) -> f64 {
        self.song.duration
    }
}

impl From<CacheEntry> for QueueEntry {
    fn from(song: CacheEntry) -> Self {
        Self::new(song, 0.0, false, false)
    }
}
