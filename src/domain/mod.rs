//! Domain types for the song queue.
//!
//! This module contains the core data structures:
//! - MediaId: canonical id extracted from any accepted URL
//! - CacheEntry: a resolved (and possibly downloaded) song
//! - QueueEntry: a cache entry plus playback bookkeeping

pub mod media_id;
pub mod queue_entry;
pub mod song;

// Re-export commonly used types
pub use media_id::{sanitize, shorten, MediaId};
pub use queue_entry::QueueEntry;
pub use song::{BlockReason, CacheEntry, LocalData};
