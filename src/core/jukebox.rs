//! The jukebox: caller-facing operations over the cache and the queue.
//!
//! One `Jukebox` owns the cache store, the download directory and the queue
//! for the whole process. `start` loads saved state, `shutdown` pauses
//! playback and saves it again.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::error::MusicError;
use crate::adapters::{MediaTool, YtDlp};
use crate::config::ResolvedConfig;
use crate::domain::{shorten, BlockReason, CacheEntry, MediaId, QueueEntry};
use crate::download::{DownloadOrchestrator, FileWatchService};
use crate::library::{CacheService, CacheStore, JsonListStore};
use crate::queue::{PlaybackState, QueueService, Skipped, StatusBroadcaster};

/// Result of a song request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AddOutcome {
    /// Appended to the queue
    Queued { entry: QueueEntry, eta: String },

    /// Refused; the entry stays cached so the refusal is cheap next time
    Blocked { entry: CacheEntry, reason: BlockReason },
}

impl AddOutcome {
    /// Message for the requester
    pub fn message(&self) -> String {
        match self {
            AddOutcome::Queued { entry, eta } if eta == "now" => format!(
                "Added {} - {} to queue! Playing now.",
                entry.artist(),
                entry.title()
            ),
            AddOutcome::Queued { entry, eta } => format!(
                "Added {} - {} to queue! Playing in ~{}.",
                entry.artist(),
                entry.title(),
                eta
            ),
            AddOutcome::Blocked { reason, .. } => {
                format!("Song will not be added to queue! {}", reason.message())
            }
        }
    }
}

/// Which queue entries to remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueTarget {
    /// Every entry with the same canonical id as this URL
    Url(String),

    /// The entry at this zero-based position
    Position(usize),
}

/// Song cache plus playback queue
pub struct Jukebox {
    cache: CacheService,
    queue: QueueService,
}

impl Jukebox {
    /// Build a jukebox that downloads with yt-dlp
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, MusicError> {
        let tool = YtDlp::with_binary_path(&config.download.binary)
            .with_cookies(config.music.cookies_from_browser)
            .with_output_template(&config.download.output_template)
            .with_timeout(config.download.process_timeout());
        Self::with_tool(config, Arc::new(tool))
    }

    /// Build a jukebox around any media tool
    pub fn with_tool(config: &ResolvedConfig, tool: Arc<dyn MediaTool>) -> Result<Self, MusicError> {
        let watcher = Arc::new(FileWatchService::new(config.download.file_watch_timeout())?);
        let downloader = DownloadOrchestrator::new(
            tool,
            watcher,
            &config.download_dir,
            config.music.max_song_duration_seconds,
        );
        let store = Arc::new(CacheStore::new(JsonListStore::new(&config.cache_file)));

        Ok(Self {
            cache: CacheService::new(store, downloader),
            queue: QueueService::new(
                JsonListStore::new(&config.queue_file),
                Arc::new(StatusBroadcaster::new()),
            ),
        })
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn queue(&self) -> &QueueService {
        &self.queue
    }

    // ==================== Lifecycle ====================

    /// Load the saved cache (then clean it) and the saved queue
    pub async fn start(&self) -> Result<(), MusicError> {
        self.cache.store().load().await?;
        self.cache.cleanup_cache().await;
        self.queue.load().await?;
        info!(
            cached = self.cache.store().len().await,
            queued = self.queue.len().await,
            "Jukebox started"
        );
        Ok(())
    }

    /// Pause the head so it does not resume on restart, clean and save
    pub async fn shutdown(&self) -> Result<(), MusicError> {
        self.queue.pause().await;
        self.cache.cleanup_cache().await;
        self.cache.store().save().await?;
        self.queue.save().await?;
        info!("Jukebox state saved");
        Ok(())
    }

    /// Save both collections without touching playback
    pub async fn save(&self) -> Result<(), MusicError> {
        self.cache.store().save().await?;
        self.queue.save().await?;
        Ok(())
    }

    // ==================== Requests ====================

    /// Resolve `url` (downloading on a cache miss) and append it to the queue
    #[instrument(skip(self))]
    pub async fn add_to_queue(&self, url: &str) -> Result<AddOutcome, MusicError> {
        let id = shorten(url)?;
        let entry = self.resolve(&id, url).await?;

        if !entry.is_playable() {
            let reason = entry.block_reason.unwrap_or(BlockReason::Blacklisted);
            info!(id = %id, %reason, "Song is blocked and will not be queued");
            return Ok(AddOutcome::Blocked { entry, reason });
        }

        let (entry, position, eta) = self.queue.enqueue_with_eta(entry).await;
        if position == 0 {
            self.cache.store().touch_played(&id).await;
        }
        info!(
            id = %id,
            position,
            "Added {} - {} to queue, playing in ~{}",
            entry.artist(),
            entry.title(),
            eta
        );
        Ok(AddOutcome::Queued { entry, eta })
    }

    /// Cached entry for `url`, resolved again if its file has gone missing.
    ///
    /// The result is always consistent: blocked, or backed by local data.
    async fn resolve(&self, id: &MediaId, url: &str) -> Result<CacheEntry, MusicError> {
        let mut entry = self.cache_or_cleanup(id, url).await?;
        if !entry.blocked && entry.local_data.as_ref().is_some_and(|l| !l.file_exists()) {
            warn!(id = %id, "Cached file is gone, resolving again");
            self.cache.cleanup_cache().await;
            entry = self.cache_or_cleanup(id, url).await?;
        }

        if !entry.is_consistent() {
            error!(id = %id, "Song is not blocked but has no local data");
            self.cache.cleanup_cache().await;
            return Err(MusicError::InternalInconsistency(id.to_string()));
        }
        Ok(entry)
    }

    async fn cache_or_cleanup(&self, id: &MediaId, url: &str) -> Result<CacheEntry, MusicError> {
        match self.cache.cache_song(url).await {
            Ok(entry) => Ok(entry),
            Err(e) => {
                error!(id = %id, "Failed to cache song: {}", e);
                self.cache.cleanup_cache().await;
                Err(e)
            }
        }
    }

    /// Why a blocked entry is refused
    fn block_error(&self, entry: &CacheEntry) -> MusicError {
        match entry.block_reason {
            Some(BlockReason::TooLong) => MusicError::TooLong {
                actual: entry.duration,
                limit: self.cache.downloader().max_duration_seconds(),
            },
            Some(BlockReason::AgeRestricted) => MusicError::AgeRestricted(entry.id.to_string()),
            Some(BlockReason::Blacklisted) | None => MusicError::Blacklisted(entry.id.to_string()),
        }
    }

    /// Remove entries by URL or position, returning how many were removed
    pub async fn remove_from_queue(&self, target: QueueTarget) -> Result<usize, MusicError> {
        match target {
            QueueTarget::Url(url) => self.queue.dequeue_by_url(&url).await,
            QueueTarget::Position(position) => {
                Ok(self.queue.dequeue_at(position).await.map_or(0, |_| 1))
            }
        }
    }

    pub async fn play(&self) -> Option<PlaybackState> {
        self.queue.play().await
    }

    pub async fn pause(&self) -> Option<PlaybackState> {
        self.queue.pause().await
    }

    /// Skip the head; the new head starts playing
    pub async fn skip(&self) -> Option<Skipped> {
        let skipped = self.queue.skip().await?;
        if let Some(next) = &skipped.next {
            self.cache.store().touch_played(next.id()).await;
        }
        Some(skipped)
    }

    /// How long until the queue runs dry, as "now" or "<n> minutes"
    pub async fn queue_empty_in_as_string(&self) -> String {
        self.queue.queue_empty_in_as_string().await
    }

    pub async fn queue_entries(&self) -> Vec<QueueEntry> {
        self.queue.entries().await
    }

    pub async fn now_playing(&self) -> Option<QueueEntry> {
        self.queue.head().await
    }

    // ==================== Cache ====================

    pub async fn get_music_cache_entry(&self, url: &str) -> Result<Option<CacheEntry>, MusicError> {
        self.cache.get_music_cache_entry(url).await
    }

    pub async fn get_cache_entry_by_id(&self, id: &MediaId) -> Option<CacheEntry> {
        self.cache.get_by_id(id).await
    }

    /// Resolve and cache `url` without queueing it.
    ///
    /// Blocked songs stay cached but are reported as a soft-block error.
    pub async fn cache_song(&self, url: &str) -> Result<CacheEntry, MusicError> {
        let id = shorten(url)?;
        let entry = self.resolve(&id, url).await?;
        if entry.blocked {
            return Err(self.block_error(&entry));
        }
        Ok(entry)
    }

    pub async fn cleanup_cache(&self) -> usize {
        self.cache.cleanup_cache().await
    }

    // ==================== Live status ====================

    /// Register a live status subscriber; the first message is the current head
    pub async fn subscribe(&self) -> (Uuid, UnboundedReceiver<String>) {
        self.queue.subscribe().await
    }

    pub fn unsubscribe(&self, id: &Uuid) {
        self.queue.unsubscribe(id);
    }
}
