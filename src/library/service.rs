//! Cache service: the cache store plus the download orchestrator.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::store::CacheStore;
use crate::core::error::MusicError;
use crate::domain::{shorten, CacheEntry, MediaId};
use crate::download::DownloadOrchestrator;

/// Looks songs up in the cache and downloads them on a miss
pub struct CacheService {
    store: Arc<CacheStore>,
    downloader: DownloadOrchestrator,
}

impl CacheService {
    pub fn new(store: Arc<CacheStore>, downloader: DownloadOrchestrator) -> Self {
        Self { store, downloader }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn downloader(&self) -> &DownloadOrchestrator {
        &self.downloader
    }

    /// Cached entry for a URL, without downloading
    pub async fn get_music_cache_entry(&self, url: &str) -> Result<Option<CacheEntry>, MusicError> {
        let id = shorten(url)?;
        Ok(self.store.get(&id).await)
    }

    /// Cached entry for an id
    pub async fn get_by_id(&self, id: &MediaId) -> Option<CacheEntry> {
        self.store.get(id).await
    }

    /// Return the cached entry for `url`, resolving and downloading it first
    /// on a miss.
    ///
    /// The returned entry may be blocked, or (after a failed download)
    /// unblocked without local data; the caller decides what to do with it.
    #[instrument(skip(self))]
    pub async fn cache_song(&self, url: &str) -> Result<CacheEntry, MusicError> {
        let id = shorten(url)?;

        if let Some(entry) = self.store.get(&id).await {
            debug!(id = %id, "Cache hit");
            return Ok(entry);
        }

        info!(id = %id, "Cache miss, resolving");
        let entry = self.downloader.download_song(url).await?;
        self.store.add(entry.clone()).await;
        Ok(entry)
    }

    /// Run a cleanup pass over the cache
    pub async fn cleanup_cache(&self) -> usize {
        self.store.cleanup().await
    }
}
