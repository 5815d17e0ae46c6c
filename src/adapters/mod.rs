//! Adapter interfaces for external systems.
//!
//! The only external system is the media tool (yt-dlp). It is reached through
//! the `MediaTool` trait so the resolver and orchestrator can be driven by a
//! scripted fake in tests.

pub mod process;
pub mod ytdlp;

use std::path::Path;

use async_trait::async_trait;

pub use process::{run_captured, ProcessError, ProcessOutput};
pub use ytdlp::{CookieSource, YtDlp};

/// Trait for the external media tool
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Human-readable tool name
    fn name(&self) -> &str;

    /// Run in metadata-only mode, printing one JSON line with
    /// `title`, `channel` and `duration`
    async fn fetch_metadata(&self, url: &str) -> Result<ProcessOutput, ProcessError>;

    /// Download the audio of `url` into `target_dir`
    async fn download(&self, url: &str, target_dir: &Path) -> Result<ProcessOutput, ProcessError>;

    /// Check that the tool is installed and runnable
    async fn health_check(&self) -> Result<String, ProcessError>;
}
