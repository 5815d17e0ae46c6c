//! Queue manager.
//!
//! An ordered list of queue entries. Position 0 is the song currently
//! playing; entries are only ever appended at the tail or removed.

use tracing::debug;

use crate::core::error::MusicError;
use crate::domain::{shorten, CacheEntry, MediaId, QueueEntry};

/// The playback queue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueManager {
    entries: Vec<QueueEntry>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<QueueEntry>) -> Self {
        Self { entries }
    }

    /// Append a song at the tail
    pub fn enqueue(
        &mut self,
        song: CacheEntry,
        play_time: f64,
        paused: bool,
        from_backup_playlist: bool,
    ) -> &QueueEntry {
        debug!(id = %song.id, position = self.entries.len(), "Enqueueing");
        self.entries
            .push(QueueEntry::new(song, play_time, paused, from_backup_playlist));
        &self.entries[self.entries.len() - 1]
    }

    /// Append a song with default playback state
    pub fn enqueue_default(&mut self, song: CacheEntry) -> &QueueEntry {
        self.enqueue(song, 0.0, false, false)
    }

    /// Remove every entry whose canonical id matches `url`'s
    pub fn dequeue_by_url(&mut self, url: &str) -> Result<usize, MusicError> {
        let id = shorten(url)?;
        Ok(self.dequeue_by_id(&id))
    }

    /// Remove every entry with the given id, returning how many were removed
    pub fn dequeue_by_id(&mut self, id: &MediaId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.id() != id);
        before - self.entries.len()
    }

    /// Remove the entry at `position`; out of bounds is a no-op
    pub fn dequeue_at(&mut self, position: usize) -> Option<QueueEntry> {
        if position < self.entries.len() {
            Some(self.entries.remove(position))
        } else {
            debug!(position, len = self.entries.len(), "Dequeue position out of bounds");
            None
        }
    }

    /// The currently playing entry
    pub fn head(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    pub fn head_mut(&mut self) -> Option<&mut QueueEntry> {
        self.entries.first_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Swap in a whole new queue (used when loading from disk)
    pub fn replace_all(&mut self, entries: Vec<QueueEntry>) {
        self.entries = entries;
    }

    /// Remove and return the head
    pub(crate) fn pop_head(&mut self) -> Option<QueueEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }
}
