//! Cache store.
//!
//! The in-memory list of resolved songs, keyed by canonical id and backed by
//! a JSON file. Reads share the lock; every mutation takes it exclusively.

use std::collections::HashSet;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::persistence::{JsonListStore, PersistenceError};
use crate::domain::{CacheEntry, MediaId};

/// Persistent cache of resolved songs
pub struct CacheStore {
    entries: RwLock<Vec<CacheEntry>>,
    persistence: JsonListStore,
}

impl CacheStore {
    pub fn new(persistence: JsonListStore) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            persistence,
        }
    }

    /// First entry with the given id
    pub async fn get(&self, id: &MediaId) -> Option<CacheEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| &e.id == id)
            .cloned()
    }

    /// Append an entry.
    ///
    /// Duplicate ids are kept until the next cleanup, which retains the
    /// first occurrence.
    pub async fn add(&self, entry: CacheEntry) {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            warn!(id = %entry.id, "Cache already holds this id, keeping duplicate until cleanup");
        }
        debug!(id = %entry.id, blocked = entry.blocked, "Caching entry");
        entries.push(entry);
    }

    /// Remove every entry with the given id, returning how many were removed
    pub async fn remove(&self, id: &MediaId) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| &e.id != id);
        before - entries.len()
    }

    /// Drop inconsistent, orphaned and duplicate entries.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let mut seen = HashSet::new();

        entries.retain(|e| {
            if !e.is_consistent() {
                debug!(id = %e.id, "Removing unblocked entry without local data");
                return false;
            }
            if !e.is_valid() {
                debug!(id = %e.id, "Removing entry whose file is gone");
                return false;
            }
            if !seen.insert(e.id.clone()) {
                debug!(id = %e.id, "Removing duplicate entry");
                return false;
            }
            true
        });

        let removed = before - entries.len();
        if removed > 0 {
            info!(removed, remaining = entries.len(), "Cleaned up cache");
        }
        removed
    }

    /// Record that a song just started playing
    pub async fn touch_played(&self, id: &MediaId) {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        for local_data in entries
            .iter_mut()
            .filter(|e| &e.id == id)
            .filter_map(|e| e.local_data.as_mut())
        {
            local_data.last_played_at = Some(now);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of all entries in insertion order
    pub async fn entries(&self) -> Vec<CacheEntry> {
        self.entries.read().await.clone()
    }

    /// Replace the in-memory list with the saved one
    pub async fn load(&self) -> Result<usize, PersistenceError> {
        let loaded: Vec<CacheEntry> = self.persistence.load().await?;
        let count = loaded.len();
        *self.entries.write().await = loaded;
        info!(count, path = %self.persistence.path().display(), "Loaded cache");
        Ok(count)
    }

    /// Write the in-memory list to disk
    pub async fn save(&self) -> Result<(), PersistenceError> {
        let entries = self.entries.read().await;
        self.persistence.save(entries.as_slice()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockReason, LocalData};
    use tempfile::TempDir;

    fn entry(id: &str) -> CacheEntry {
        let url = format!("https://youtu.be/{}", id);
        CacheEntry::new(MediaId::from_url(&url).unwrap(), url, "Title", "Channel", 30.0)
    }

    fn downloaded(temp: &TempDir, id: &str) -> CacheEntry {
        let path = temp.path().join(format!("{}.mp3", id));
        std::fs::write(&path, b"audio").unwrap();
        entry(id).with_local_data(LocalData::from_path(&path))
    }

    fn store(temp: &TempDir) -> CacheStore {
        CacheStore::new(JsonListStore::new(temp.path().join("cache.json")))
    }

    #[tokio::test]
    async fn test_cleanup_invariants() {
        let temp = TempDir::new().unwrap();
        let cache = store(&temp);

        let mut blocked = entry("BBBBBBBBBBB");
        blocked.block(BlockReason::TooLong);
        let kept = downloaded(&temp, "AAAAAAAAAAA");
        let orphan = downloaded(&temp, "CCCCCCCCCCC");
        std::fs::remove_file(&orphan.local_data.as_ref().unwrap().full_path).unwrap();

        cache.add(kept.clone()).await;
        cache.add(blocked.clone()).await;
        cache.add(entry("DDDDDDDDDDD")).await;
        cache.add(orphan).await;
        let mut duplicate = kept.clone();
        duplicate.title = "Second".to_string();
        cache.add(duplicate).await;

        assert_eq!(cache.cleanup().await, 3);

        let entries = cache.entries().await;
        assert_eq!(entries, vec![kept, blocked]);
        for e in &entries {
            assert!(e.blocked || e.local_data.is_some());
            assert!(e.local_data.as_ref().map_or(true, |l| l.full_path.exists()));
        }
    }

    #[tokio::test]
    async fn test_get_remove_and_touch() {
        let temp = TempDir::new().unwrap();
        let cache = store(&temp);
        let e = downloaded(&temp, "AAAAAAAAAAA");
        let id = e.id.clone();
        cache.add(e).await;

        cache.touch_played(&id).await;
        let found = cache.get(&id).await.unwrap();
        assert!(found.local_data.unwrap().last_played_at.is_some());

        assert_eq!(cache.remove(&id).await, 1);
        assert!(cache.get(&id).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let cache = store(&temp);
        cache.add(downloaded(&temp, "AAAAAAAAAAA")).await;
        cache.save().await.unwrap();

        let reloaded = store(&temp);
        assert_eq!(reloaded.load().await.unwrap(), 1);
        assert_eq!(reloaded.entries().await, cache.entries().await);
    }
}
