//! Download orchestrator.
//!
//! Resolves metadata, applies the block policy and, for playable media,
//! downloads the audio and records where it landed.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use super::metadata::MetadataResolver;
use super::watcher::FileWatchService;
use crate::adapters::{MediaTool, ProcessOutput};
use crate::core::error::MusicError;
use crate::domain::{sanitize, BlockReason, CacheEntry, LocalData, MediaId};

const DESTINATION_MARKER: &str = "destination:";
const CORRECTING_MARKER: &str = "correcting container";
const ALREADY_PREFIX: &str = "[download] ";
const ALREADY_SUFFIX: &str = " has already been downloaded";

/// What the downloader reported about its output file
#[derive(Debug, Default, PartialEq)]
pub struct DownloadReport {
    /// Final destination (last reported wins)
    pub destination: Option<PathBuf>,

    /// A container fixup runs after the process output ends
    pub correcting_container: bool,
}

impl DownloadReport {
    /// Parse downloader output, stdout first then stderr
    pub fn parse(output: &ProcessOutput) -> Self {
        let mut report = Self::default();

        for line in output.lines() {
            // ASCII lowering keeps byte offsets valid for slicing `line`
            let lower = line.to_ascii_lowercase();

            if lower.contains(CORRECTING_MARKER) {
                report.correcting_container = true;
            }

            if let Some(pos) = lower.find(DESTINATION_MARKER) {
                let candidate = line[pos + DESTINATION_MARKER.len()..].trim();
                if is_file_candidate(candidate) {
                    report.destination = Some(PathBuf::from(candidate));
                }
            } else if let Some(path) = line
                .trim()
                .strip_prefix(ALREADY_PREFIX)
                .and_then(|rest| rest.strip_suffix(ALREADY_SUFFIX))
            {
                let candidate = path.trim();
                if is_file_candidate(candidate) {
                    report.destination = Some(PathBuf::from(candidate));
                }
            }
        }

        report
    }
}

fn is_file_candidate(candidate: &str) -> bool {
    !candidate.is_empty() && !candidate.ends_with('/') && !candidate.ends_with('\\')
}

/// Downloads songs and builds their cache entries
pub struct DownloadOrchestrator {
    tool: Arc<dyn MediaTool>,
    resolver: MetadataResolver,
    watcher: Arc<FileWatchService>,
    download_dir: PathBuf,
    max_duration_seconds: u64,
}

impl DownloadOrchestrator {
    pub fn new(
        tool: Arc<dyn MediaTool>,
        watcher: Arc<FileWatchService>,
        download_dir: impl Into<PathBuf>,
        max_duration_seconds: u64,
    ) -> Self {
        Self {
            resolver: MetadataResolver::new(Arc::clone(&tool)),
            tool,
            watcher,
            download_dir: download_dir.into(),
            max_duration_seconds,
        }
    }

    pub fn max_duration_seconds(&self) -> u64 {
        self.max_duration_seconds
    }

    /// Resolve and, if allowed, download `url`.
    ///
    /// Blocked entries are returned without downloading. A failed download
    /// is logged and yields the entry without local data, which the caller
    /// must treat as inconsistent.
    #[instrument(skip(self))]
    pub async fn download_song(&self, url: &str) -> Result<CacheEntry, MusicError> {
        let mut entry = self.resolver.fetch_metadata(url).await?;

        if entry.blocked {
            return Ok(entry);
        }

        if entry.duration > self.max_duration_seconds as f64 {
            info!(
                id = %entry.id,
                duration = entry.duration,
                limit = self.max_duration_seconds,
                "Blocking song longer than the allowed duration"
            );
            entry.block(BlockReason::TooLong);
            return Ok(entry);
        }

        match self.perform_download(url, &entry.id).await {
            Ok(local_data) => {
                info!(id = %entry.id, path = %local_data.full_path.display(), "Song downloaded");
                Ok(entry.with_local_data(local_data))
            }
            Err(e) => {
                error!(id = %entry.id, "Download failed: {}", e);
                Ok(entry)
            }
        }
    }

    async fn perform_download(&self, url: &str, id: &MediaId) -> Result<LocalData, MusicError> {
        debug!(id = %id, dir = %self.download_dir.display(), "Starting download");
        let output = self.tool.download(&sanitize(url), &self.download_dir).await?;
        if !output.success() {
            warn!(id = %id, exit_code = ?output.exit_code, "Downloader exited non-zero");
        }

        let report = DownloadReport::parse(&output);
        let destination = report.destination.ok_or_else(|| {
            MusicError::DownloadParseFailed(format!("no destination reported for {}", id))
        })?;
        let destination = if destination.is_relative() {
            self.download_dir.join(destination)
        } else {
            destination
        };

        if report.correcting_container {
            debug!(id = %id, path = %destination.display(), "Waiting for container fixup");
            self.watcher.wait_for_file(&destination).await?;
        }

        Ok(LocalData::from_path(&destination))
    }
}
