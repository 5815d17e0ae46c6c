//! JSON list persistence.
//!
//! Stores an ordered list as one pretty-printed JSON array. Saves hold an
//! exclusive advisory lock on a sibling `.lock` file and replace the target
//! atomically via a temp file and rename.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Errors from loading or saving a list
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Save task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PersistenceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonListStore {
    path: PathBuf,
}

impl JsonListStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the list; a missing file is an empty list
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>, PersistenceError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No saved list, starting empty");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|source| PersistenceError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the saved list with `items`
    pub async fn save<T: Serialize>(&self, items: &[T]) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(items).map_err(|source| {
            PersistenceError::Json {
                path: self.path.clone(),
                source,
            }
        })?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_locked(&path, content.as_bytes())).await??;

        debug!(path = %self.path.display(), count = items.len(), "Saved list");
        Ok(())
    }
}

fn write_locked(path: &Path, content: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
    }

    let lock_path = path.with_extension("lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| PersistenceError::io(&lock_path, e))?;
    lock_file
        .lock_exclusive()
        .map_err(|e| PersistenceError::io(&lock_path, e))?;

    let tmp_path = path.with_extension("json.tmp");
    let result = (|| {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(content)?;
        tmp.sync_all()?;
        std::fs::rename(&tmp_path, path)
    })()
    .map_err(|e| PersistenceError::io(path, e));

    let _ = lock_file.unlock();
    result
}
