//! Download pipeline: metadata resolution, downloading and file watching.

pub mod metadata;
pub mod orchestrator;
pub mod watcher;

pub use metadata::MetadataResolver;
pub use orchestrator::{DownloadOrchestrator, DownloadReport};
pub use watcher::{FileWatchService, WatchError};
