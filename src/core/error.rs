//! Error taxonomy for the song queue.
//!
//! Soft blocks (too long, age restricted, blacklisted) are recorded on the
//! cache entry. Queue requests report them as a normal outcome; the cache
//! path raises them so callers can refuse the entry and say why.

use thiserror::Error;

use crate::adapters::process::ProcessError;
use crate::download::watcher::WatchError;
use crate::library::persistence::PersistenceError;

/// Errors raised by the cache, download and queue layers
#[derive(Debug, Error)]
pub enum MusicError {
    #[error("URL is not a recognized media URL: {0}")]
    NotRecognizedUrl(String),

    #[error("Metadata extraction failed for {url}: {reason}")]
    MetadataExtractionFailed { url: String, reason: String },

    #[error("Media is age restricted: {0}")]
    AgeRestricted(String),

    #[error("Media exceeds the allowed duration: {actual}s > {limit}s")]
    TooLong { actual: f64, limit: u64 },

    #[error("Failed to parse downloader output: {0}")]
    DownloadParseFailed(String),

    #[error("Media is blacklisted: {0}")]
    Blacklisted(String),

    #[error("External process failed: {0}")]
    Process(#[from] ProcessError),

    #[error("Cache entry {0} is not blocked but has no local data")]
    InternalInconsistency(String),

    #[error("File watch failed: {0}")]
    Watch(#[from] WatchError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl MusicError {
    /// Whether the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, MusicError::NotRecognizedUrl(_))
    }

    /// Whether this is a deliberate refusal rather than a failure
    pub fn is_soft_block(&self) -> bool {
        matches!(
            self,
            MusicError::AgeRestricted(_) | MusicError::TooLong { .. } | MusicError::Blacklisted(_)
        )
    }
}
