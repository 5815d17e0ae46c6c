//! Playback queue: ordering, playback control, wait estimates and live status.

pub mod broadcast;
pub mod duration;
pub mod manager;
pub mod playback;
pub mod service;

pub use broadcast::StatusBroadcaster;
pub use manager::QueueManager;
pub use playback::PlaybackState;
pub use service::{QueueService, Skipped};
