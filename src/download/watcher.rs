//! File watch service.
//!
//! Lets a caller wait until a file appears on disk. yt-dlp finishes some
//! downloads with an out-of-process container fixup, so the final file can
//! show up after the process output has already been parsed.
//!
//! A single notify watcher serves every pending wait. Waiters are grouped by
//! file name and completed from the notify callback; the directories they
//! live in are watched while at least one waiter needs them.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Errors that can occur while waiting for a file
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Path has no parent directory or file name: {0}")]
    InvalidPath(PathBuf),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Watch backend failed: {0}")]
    Backend(String),

    #[error("Timed out after {seconds}s waiting for {path}")]
    Timeout { path: PathBuf, seconds: u64 },

    #[error("Watch service shut down while waiting for {0}")]
    Closed(PathBuf),
}

type WaitResult = Result<(), WatchError>;

struct Waiter {
    id: u64,
    /// Canonical directory the file is expected in
    dir: PathBuf,
    tx: oneshot::Sender<WaitResult>,
}

/// Pending waits keyed by target file name
#[derive(Default)]
struct Pending {
    by_name: HashMap<OsString, Vec<Waiter>>,
}

impl Pending {
    fn insert(&mut self, name: OsString, waiter: Waiter) {
        self.by_name.entry(name).or_default().push(waiter);
    }

    fn remove(&mut self, name: &OsString, id: u64) -> Option<Waiter> {
        let waiters = self.by_name.get_mut(name)?;
        let pos = waiters.iter().position(|w| w.id == id)?;
        let waiter = waiters.swap_remove(pos);
        if waiters.is_empty() {
            self.by_name.remove(name);
        }
        Some(waiter)
    }

    /// Complete every waiter for `path`'s name whose directory matches
    fn complete_created(&mut self, path: &Path) {
        let Some(name) = path.file_name().map(OsString::from) else {
            return;
        };
        let Some(waiters) = self.by_name.get_mut(&name) else {
            trace!(path = %path.display(), "Ignoring created file nobody waits for");
            return;
        };

        let dir = path
            .parent()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()));

        let (matched, rest): (Vec<Waiter>, Vec<Waiter>) = waiters
            .drain(..)
            .partition(|w| dir.as_deref() == Some(w.dir.as_path()));
        *waiters = rest;
        if waiters.is_empty() {
            self.by_name.remove(&name);
        }

        for waiter in matched {
            info!(path = %path.display(), "Target file detected");
            let _ = waiter.tx.send(Ok(()));
        }
    }

    /// Fail every pending waiter
    fn fail_all(&mut self, message: &str) {
        for (_, waiters) in self.by_name.drain() {
            for waiter in waiters {
                let _ = waiter.tx.send(Err(WatchError::Backend(message.to_string())));
            }
        }
    }
}

/// The notify watcher plus a reference count per watched directory
struct DirWatcher {
    watcher: RecommendedWatcher,
    dirs: HashMap<PathBuf, usize>,
}

impl DirWatcher {
    fn acquire(&mut self, dir: &Path) -> Result<(), WatchError> {
        if let Some(count) = self.dirs.get_mut(dir) {
            *count += 1;
            return Ok(());
        }
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        debug!(dir = %dir.display(), "Watching directory for file creation");
        self.dirs.insert(dir.to_path_buf(), 1);
        Ok(())
    }

    fn release(&mut self, dir: &Path) {
        let Some(count) = self.dirs.get_mut(dir) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.dirs.remove(dir);
            if let Err(e) = self.watcher.unwatch(dir) {
                warn!(dir = %dir.display(), "Failed to unwatch directory: {}", e);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waits for files to appear, multiplexing all waits over one watcher
pub struct FileWatchService {
    pending: Arc<Mutex<Pending>>,
    dirs: Mutex<DirWatcher>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl FileWatchService {
    /// Create the service; every wait gives up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, WatchError> {
        let pending = Arc::new(Mutex::new(Pending::default()));

        let callback_pending = Arc::clone(&pending);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let created = matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
                );
                if created {
                    let mut pending = lock(&callback_pending);
                    for path in &event.paths {
                        pending.complete_created(path);
                    }
                }
            }
            Err(e) => {
                warn!("Watcher error, failing pending waits: {}", e);
                lock(&callback_pending).fail_all(&e.to_string());
            }
        })?;

        Ok(Self {
            pending,
            dirs: Mutex::new(DirWatcher {
                watcher,
                dirs: HashMap::new(),
            }),
            next_id: AtomicU64::new(1),
            timeout,
        })
    }

    /// Maximum time a single wait may take
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of waits currently in flight
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).by_name.values().map(Vec::len).sum()
    }

    /// Resolve once `path` exists.
    ///
    /// Returns immediately if the file is already there; otherwise waits for
    /// a creation (or rename-into) event in its parent directory.
    pub async fn wait_for_file(&self, path: &Path) -> Result<(), WatchError> {
        if path.exists() {
            debug!(path = %path.display(), "File already exists");
            return Ok(());
        }

        let (dir, name) = match (path.parent(), path.file_name()) {
            (Some(dir), Some(name)) => (dir, name.to_os_string()),
            _ => return Err(WatchError::InvalidPath(path.to_path_buf())),
        };
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let dir = dir
            .canonicalize()
            .map_err(|_| WatchError::DirectoryNotFound(dir.to_path_buf()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(
            name.clone(),
            Waiter {
                id,
                dir: dir.clone(),
                tx,
            },
        );
        let mut registration = Registration {
            service: self,
            name,
            id,
            dir,
            watching: false,
        };

        lock(&self.dirs).acquire(&registration.dir)?;
        registration.watching = true;

        if path.exists() {
            // Created between the first check and the watch starting
            return Ok(());
        }

        debug!(path = %path.display(), timeout = ?self.timeout, "Waiting for file");
        match timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(WatchError::Closed(path.to_path_buf())),
            Err(_) => Err(WatchError::Timeout {
                path: path.to_path_buf(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

/// One in-flight wait; dropping it deregisters the waiter and releases the
/// directory, whether the wait finished or its future was dropped
struct Registration<'a> {
    service: &'a FileWatchService,
    name: OsString,
    id: u64,
    dir: PathBuf,
    watching: bool,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        lock(&self.service.pending).remove(&self.name, self.id);
        if self.watching {
            lock(&self.service.dirs).release(&self.dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(timeout: Duration) -> Arc<FileWatchService> {
        Arc::new(FileWatchService::new(timeout).unwrap())
    }

    #[tokio::test]
    async fn test_existing_file_completes_immediately() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("song.mp3");
        std::fs::write(&path, b"audio").unwrap();

        let watch = service(Duration::from_secs(1));
        watch.wait_for_file(&path).await.unwrap();
        assert_eq!(watch.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_waits_for_creation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("song.mp3");
        let watch = service(Duration::from_secs(10));

        let waiter = {
            let watch = Arc::clone(&watch);
            let path = path.clone();
            tokio::spawn(async move { watch.wait_for_file(&path).await })
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(temp.path().join("other.mp3"), b"x").unwrap();
        std::fs::write(&path, b"audio").unwrap();

        waiter.await.unwrap().unwrap();
        assert_eq!(watch.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_times_out() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("never.mp3");
        let watch = service(Duration::from_millis(200));

        let result = watch.wait_for_file(&path).await;
        assert!(matches!(result, Err(WatchError::Timeout { .. })));
        assert_eq!(watch.pending_count(), 0);
        assert_eq!(watched_dirs(&watch), 0);
    }

    fn watched_dirs(watch: &FileWatchService) -> usize {
        lock(&watch.dirs).dirs.len()
    }

    #[tokio::test]
    async fn test_cancelled_wait_is_deregistered() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abandoned.mp3");
        let watch = service(Duration::from_secs(300));

        let outer = tokio::time::timeout(Duration::from_millis(100), watch.wait_for_file(&path)).await;
        assert!(outer.is_err());
        assert_eq!(watch.pending_count(), 0);
        assert_eq!(watched_dirs(&watch), 0);

        // The directory can be watched again afterwards
        let waiter = {
            let watch = Arc::clone(&watch);
            let path = path.clone();
            tokio::spawn(async move { watch.wait_for_file(&path).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&path, b"audio").unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(watched_dirs(&watch), 0);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope").join("song.mp3");
        let watch = service(Duration::from_secs(1));

        let result = watch.wait_for_file(&path).await;
        assert!(matches!(result, Err(WatchError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_many_waits_share_one_directory() {
        let temp = TempDir::new().unwrap();
        let watch = service(Duration::from_secs(10));

        let mut handles = Vec::new();
        for i in 0..3 {
            let watch = Arc::clone(&watch);
            let path = temp.path().join(format!("song{}.mp3", i));
            handles.push(tokio::spawn(async move { watch.wait_for_file(&path).await }));
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        for i in 0..3 {
            std::fs::write(temp.path().join(format!("song{}.mp3", i)), b"audio").unwrap();
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(watch.pending_count(), 0);
    }
}
