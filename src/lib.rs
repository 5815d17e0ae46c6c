//! songq - song-request media queue
//!
//! Resolves requested media URLs with yt-dlp, keeps a durable cache keyed by
//! canonical media id so repeat requests never download twice, maintains an
//! ordered playback queue and pushes the current song to live viewers.
//!
//! # Modules
//!
//! - `domain`: Data structures (MediaId, CacheEntry, QueueEntry)
//! - `adapters`: External tools (yt-dlp, process runner)
//! - `download`: Metadata resolution, downloading, file watching
//! - `library`: Song cache and its persistence
//! - `queue`: Playback queue, playback control, wait estimates, live status
//! - `core`: Jukebox facade and error taxonomy
//! - `server`: HTTP + WebSocket surface
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve the HTTP API and live status socket
//! songq serve
//!
//! # Request a song
//! songq add "https://youtu.be/lgzCxqQUU5g?si=OGS77kTm_KTKp8I0"
//!
//! # How long until the queue is empty
//! songq eta
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod download;
pub mod library;
pub mod queue;
pub mod server;

// Re-export main types at crate root for convenience
pub use core::{AddOutcome, Jukebox, MusicError, QueueTarget};
pub use domain::{BlockReason, CacheEntry, LocalData, MediaId, QueueEntry};
