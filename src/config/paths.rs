//! Directory layout for songq state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use songq::config::{self, paths};
//!
//! let cfg = config::config()?;
//! paths::ensure_dirs(cfg)?;
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use super::ResolvedConfig;

/// Directories that must exist before the jukebox starts
pub fn required_dirs(config: &ResolvedConfig) -> Vec<PathBuf> {
    let mut dirs = vec![config.home.clone(), config.download_dir.clone()];
    for file in [&config.cache_file, &config.queue_file] {
        if let Some(parent) = file.parent() {
            dirs.push(parent.to_path_buf());
        }
    }
    dirs.sort();
    dirs.dedup();
    dirs
}

/// Create every required directory that is missing
pub fn ensure_dirs(config: &ResolvedConfig) -> Result<()> {
    for dir in required_dirs(config) {
        if dir.exists() {
            debug!(dir = %dir.display(), "Directory already exists");
            continue;
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        debug!(dir = %dir.display(), "Created directory");
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
