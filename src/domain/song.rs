//! Cached song records.
//!
//! A `CacheEntry` is created the first time a URL resolves and is only
//! mutated by the cache layer afterwards.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media_id::MediaId;

/// Why an entry is withheld from playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    /// Longer than the configured maximum
    TooLong,

    /// Manually blacklisted
    Blacklisted,

    /// Requires a signed-in, age-verified account
    AgeRestricted,
}

impl BlockReason {
    /// Human-readable explanation
    pub fn message(&self) -> &'static str {
        match self {
            BlockReason::TooLong => "Exceeded allowed play time.",
            BlockReason::Blacklisted => "Blacklisted.",
            BlockReason::AgeRestricted => "Age Restricted.",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Location of a downloaded file on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalData {
    /// Absolute path to the file
    pub full_path: PathBuf,

    /// File name without extension
    pub filename: String,

    /// Extension without the dot
    pub extension: String,

    /// Directory containing the file
    pub directory: PathBuf,

    /// When the download finished
    pub downloaded_at: DateTime<Utc>,

    /// When the song last reached the head of the queue
    #[serde(default)]
    pub last_played_at: Option<DateTime<Utc>>,
}

impl LocalData {
    /// Build local data from a destination path reported by the downloader
    pub fn from_path(path: &Path) -> Self {
        let full_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        let filename = full_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = full_path
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let directory = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            full_path,
            filename,
            extension,
            directory,
            downloaded_at: Utc::now(),
            last_played_at: None,
        }
    }

    /// Whether the backing file is still on disk
    pub fn file_exists(&self) -> bool {
        self.full_path.exists()
    }
}

/// A resolved song, keyed by its canonical id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Canonical media id
    pub id: MediaId,

    /// URL the song was requested with
    pub url: String,

    pub title: String,

    /// Channel name
    pub artist: String,

    /// Duration in seconds
    pub duration: f64,

    /// Blocked entries are never downloaded or played
    #[serde(default)]
    pub blocked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<BlockReason>,

    #[serde(default)]
    pub local_data: Option<LocalData>,
}

impl CacheEntry {
    /// Create an unblocked entry from resolved metadata
    pub fn new(
        id: MediaId,
        url: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            title: title.into(),
            artist: artist.into(),
            duration,
            blocked: false,
            block_reason: None,
            local_data: None,
        }
    }

    /// Mark the entry as blocked
    pub fn block(&mut self, reason: BlockReason) {
        self.blocked = true;
        self.block_reason = Some(reason);
    }

    /// Attach local data
    pub fn with_local_data(mut self, local_data: LocalData) -> Self {
        self.local_data = Some(local_data);
        self
    }

    /// Unblocked entries must carry local data
    pub fn is_consistent(&self) -> bool {
        self.blocked || self.local_data.is_some()
    }

    /// Consistent, and any local file still exists
    pub fn is_valid(&self) -> bool {
        self.is_consistent()
            && self
                .local_data
                .as_ref()
                .map_or(true, LocalData::file_exists)
    }

    /// Ready to be enqueued
    pub fn is_playable(&self) -> bool {
        !self.blocked && self.local_data.is_some()
    }
}
