//! Song cache.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.songq/
//! ├── cache.json        # Every resolved song, blocked ones included
//! ├── queue.json        # Playback queue saved at shutdown
//! └── download/         # Downloaded audio files
//! ```

pub mod persistence;
pub mod service;
pub mod store;

pub use persistence::{JsonListStore, PersistenceError};
pub use service::CacheService;
pub use store::CacheStore;
