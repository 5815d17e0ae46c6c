//! Queue service.
//!
//! Owns the queue behind a read/write lock. Every mutation broadcasts the new
//! head before releasing the write lock, so subscribers observe mutations in
//! the order they happened.

use std::sync::Arc;

use tokio::sync::{mpsc::UnboundedReceiver, RwLock, RwLockWriteGuard};
use tracing::info;
use uuid::Uuid;

use super::broadcast::StatusBroadcaster;
use super::duration;
use super::manager::QueueManager;
use super::playback::{self, PlaybackState};
use crate::core::error::MusicError;
use crate::domain::{CacheEntry, QueueEntry};
use crate::library::{JsonListStore, PersistenceError};

/// Result of a skip
#[derive(Debug, Clone)]
pub struct Skipped {
    /// The entry that was playing
    pub skipped: QueueEntry,

    /// The entry now at the head
    pub next: Option<QueueEntry>,
}

/// The queue plus its broadcaster and persistence
pub struct QueueService {
    queue: RwLock<QueueManager>,
    broadcaster: Arc<StatusBroadcaster>,
    persistence: JsonListStore,
}

impl QueueService {
    pub fn new(persistence: JsonListStore, broadcaster: Arc<StatusBroadcaster>) -> Self {
        Self {
            queue: RwLock::new(QueueManager::new()),
            broadcaster,
            persistence,
        }
    }

    pub fn broadcaster(&self) -> &Arc<StatusBroadcaster> {
        &self.broadcaster
    }

    fn publish(&self, queue: &RwLockWriteGuard<'_, QueueManager>) {
        self.broadcaster.broadcast(queue.head());
    }

    // ==================== Mutations ====================

    pub async fn enqueue(
        &self,
        song: CacheEntry,
        play_time: f64,
        paused: bool,
        from_backup_playlist: bool,
    ) -> QueueEntry {
        let mut queue = self.queue.write().await;
        let entry = queue
            .enqueue(song, play_time, paused, from_backup_playlist)
            .clone();
        self.publish(&queue);
        entry
    }

    /// Append with zero play time, unpaused, not from the backup playlist
    pub async fn enqueue_default(&self, song: CacheEntry) -> QueueEntry {
        self.enqueue(song, 0.0, false, false).await
    }

    /// Append a requested song.
    ///
    /// Returns the entry, its position and how long until it starts playing.
    pub async fn enqueue_with_eta(&self, song: CacheEntry) -> (QueueEntry, usize, String) {
        let mut queue = self.queue.write().await;
        let eta = duration::queue_empty_in_as_string(&queue);
        let position = queue.len();
        let entry = queue.enqueue_default(song).clone();
        self.publish(&queue);
        (entry, position, eta)
    }

    pub async fn dequeue_by_url(&self, url: &str) -> Result<usize, MusicError> {
        let mut queue = self.queue.write().await;
        let removed = queue.dequeue_by_url(url)?;
        self.publish(&queue);
        Ok(removed)
    }

    pub async fn dequeue_at(&self, position: usize) -> Option<QueueEntry> {
        let mut queue = self.queue.write().await;
        let removed = queue.dequeue_at(position);
        self.publish(&queue);
        removed
    }

    pub async fn pause(&self) -> Option<PlaybackState> {
        let mut queue = self.queue.write().await;
        let state = playback::pause(&mut queue);
        self.publish(&queue);
        state
    }

    pub async fn play(&self) -> Option<PlaybackState> {
        let mut queue = self.queue.write().await;
        let state = playback::play(&mut queue);
        self.publish(&queue);
        state
    }

    pub async fn skip(&self) -> Option<Skipped> {
        let mut queue = self.queue.write().await;
        let skipped = playback::skip(&mut queue);
        self.publish(&queue);
        skipped.map(|skipped| Skipped {
            skipped,
            next: queue.head().cloned(),
        })
    }

    // ==================== Reads ====================

    pub async fn head(&self) -> Option<QueueEntry> {
        self.queue.read().await.head().cloned()
    }

    pub async fn entries(&self) -> Vec<QueueEntry> {
        self.queue.read().await.entries().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.queue.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.read().await.is_empty()
    }

    pub async fn state(&self) -> Option<PlaybackState> {
        playback::state(&*self.queue.read().await)
    }

    pub async fn total_duration(&self) -> f64 {
        duration::total_duration(&*self.queue.read().await)
    }

    pub async fn queue_empty_in(&self) -> f64 {
        duration::queue_empty_in(&*self.queue.read().await)
    }

    pub async fn queue_empty_in_as_string(&self) -> String {
        duration::queue_empty_in_as_string(&*self.queue.read().await)
    }

    /// Register a live subscriber; its first message is the current head
    pub async fn subscribe(&self) -> (Uuid, UnboundedReceiver<String>) {
        let queue = self.queue.read().await;
        self.broadcaster.subscribe_with_head(queue.head())
    }

    pub fn unsubscribe(&self, id: &Uuid) {
        self.broadcaster.unsubscribe(id);
    }

    // ==================== Persistence ====================

    /// Replace the queue with the saved one
    pub async fn load(&self) -> Result<usize, PersistenceError> {
        let entries: Vec<QueueEntry> = self.persistence.load().await?;
        let count = entries.len();

        let mut queue = self.queue.write().await;
        queue.replace_all(entries);
        self.publish(&queue);

        info!(count, path = %self.persistence.path().display(), "Loaded queue");
        Ok(count)
    }

    pub async fn save(&self) -> Result<(), PersistenceError> {
        let queue = self.queue.read().await;
        self.persistence.save(queue.entries()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::manager::tests::song;
    use tempfile::TempDir;

    fn service(temp: &TempDir) -> QueueService {
        QueueService::new(
            JsonListStore::new(temp.path().join("queue.json")),
            Arc::new(StatusBroadcaster::new()),
        )
    }

    #[tokio::test]
    async fn test_mutations_broadcast_in_order() {
        let temp = TempDir::new().unwrap();
        let queue = service(&temp);
        let (_, mut rx) = queue.subscribe().await;
        assert_eq!(rx.recv().await.unwrap(), "null");

        queue.enqueue_default(song("AAAAAAAAAAA", 30.0)).await;
        queue.pause().await;
        queue.skip().await;

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["id"], "AAAAAAAAAAA");
        assert_eq!(first["paused"], false);

        let second: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(second["paused"], true);

        assert_eq!(rx.recv().await.unwrap(), "null");
    }

    #[tokio::test]
    async fn test_enqueue_reports_position_and_wait() {
        let temp = TempDir::new().unwrap();
        let queue = service(&temp);

        let (_, position, eta) = queue.enqueue_with_eta(song("AAAAAAAAAAA", 30.0)).await;
        assert_eq!((position, eta.as_str()), (0, "now"));

        let (entry, position, eta) = queue.enqueue_with_eta(song("BBBBBBBBBBB", 30.0)).await;
        assert_eq!((position, eta.as_str()), (1, "0.5 minutes"));
        assert_eq!(entry.id().as_str(), "BBBBBBBBBBB");
    }

    #[tokio::test]
    async fn test_skip_reports_next() {
        let temp = TempDir::new().unwrap();
        let queue = service(&temp);
        queue.enqueue_default(song("AAAAAAAAAAA", 30.0)).await;
        queue.enqueue(song("BBBBBBBBBBB", 30.0), 0.0, true, false).await;

        let skipped = queue.skip().await.unwrap();
        assert_eq!(skipped.skipped.id().as_str(), "AAAAAAAAAAA");
        let next = skipped.next.unwrap();
        assert_eq!(next.id().as_str(), "BBBBBBBBBBB");
        assert!(!next.paused);
        assert_eq!(queue.state().await, Some(PlaybackState::Playing));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let queue = service(&temp);
        queue.enqueue(song("AAAAAAAAAAA", 180.0), 60.0, true, false).await;
        queue.enqueue(song("BBBBBBBBBBB", 90.0), 0.0, false, true).await;
        queue.save().await.unwrap();

        let reloaded = service(&temp);
        assert_eq!(reloaded.load().await.unwrap(), 2);
        assert_eq!(reloaded.entries().await, queue.entries().await);
        assert_eq!(reloaded.queue_empty_in().await, 120.0);
    }
}
