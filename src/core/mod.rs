//! Core of the song queue.
//!
//! This module contains:
//! - Jukebox: the caller-facing operations and lifecycle
//! - MusicError: the error taxonomy shared by every layer

pub mod error;
pub mod jukebox;

// Re-export commonly used types
pub use error::MusicError;
pub use jukebox::{AddOutcome, Jukebox, QueueTarget};
