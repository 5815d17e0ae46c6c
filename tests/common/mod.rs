//! Shared fixtures: a scripted media tool and a jukebox rooted in a temp dir.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use songq::adapters::{MediaTool, ProcessError, ProcessOutput};
use songq::config::{paths, ResolvedConfig};
use songq::domain::shorten;
use songq::Jukebox;

/// How the scripted tool answers for one media id
#[derive(Debug, Clone)]
pub enum Script {
    /// Metadata resolves; download writes `<title>.m4a`
    Song { title: String, channel: String, duration: f64 },

    /// Metadata run reports an age gate
    AgeGated,

    /// Download reports a container fixup and writes the file late
    LateFile { title: String, duration: f64 },

    /// Metadata resolves; download exits without naming a destination
    DownloadFails { title: String, duration: f64 },

    /// Metadata resolves; the downloader binary cannot be started
    SpawnFails { title: String, duration: f64 },
}

impl Script {
    pub fn song(title: &str, duration: f64) -> Self {
        Script::Song {
            title: title.to_string(),
            channel: "Test Channel".to_string(),
            duration,
        }
    }
}

/// Media tool that answers from a script instead of running yt-dlp
#[derive(Default)]
pub struct ScriptedTool {
    scripts: Mutex<HashMap<String, Script>>,
    metadata_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, id: &str, script: Script) {
        self.scripts.lock().unwrap().insert(id.to_string(), script);
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, url: &str) -> Option<Script> {
        let id = shorten(url).ok()?;
        self.scripts.lock().unwrap().get(id.as_str()).cloned()
    }
}

fn metadata_line(title: &str, channel: &str, duration: f64) -> String {
    serde_json::json!({ "title": title, "channel": channel, "duration": duration }).to_string()
}

#[async_trait]
impl MediaTool for ScriptedTool {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<ProcessOutput, ProcessError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let output = match self.lookup(url) {
            Some(Script::Song { title, channel, duration }) => {
                ProcessOutput::from_streams(&metadata_line(&title, &channel, duration), "")
            }
            Some(Script::LateFile { title, duration }) => {
                ProcessOutput::from_streams(&metadata_line(&title, "Late Channel", duration), "")
            }
            Some(Script::DownloadFails { title, duration } | Script::SpawnFails { title, duration }) => {
                ProcessOutput::from_streams(&metadata_line(&title, "Broken Channel", duration), "")
            }
            Some(Script::AgeGated) => ProcessOutput::from_streams(
                "",
                "ERROR: [youtube] AAAAAAAAAAA: Sign in to confirm your age. This video may be inappropriate for some users.",
            ),
            None => ProcessOutput::from_streams("", "ERROR: Video unavailable"),
        };
        Ok(output)
    }

    async fn download(&self, url: &str, target_dir: &Path) -> Result<ProcessOutput, ProcessError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        match self.lookup(url) {
            Some(Script::Song { title, .. }) => {
                let path = target_dir.join(format!("{}.m4a", title));
                std::fs::write(&path, b"audio").unwrap();
                Ok(ProcessOutput::from_streams(
                    &format!("[download] Destination: {}\n[download] 100% of 1.00MiB", path.display()),
                    "",
                ))
            }
            Some(Script::LateFile { title, .. }) => {
                let path = target_dir.join(format!("{}.m4a", title));
                let late = path.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    std::fs::write(late, b"audio").unwrap();
                });
                Ok(ProcessOutput::from_streams(
                    &format!("[download] Destination: {}", path.display()),
                    &format!("[FixupM4a] Correcting container of \"{}\"", path.display()),
                ))
            }
            Some(Script::SpawnFails { .. }) => Err(ProcessError::Spawn {
                program: "scripted".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such binary"),
            }),
            _ => Ok(ProcessOutput::from_streams(
                "[youtube] Extracting URL",
                "ERROR: unable to download video data: HTTP Error 403: Forbidden",
            )),
        }
    }

    async fn health_check(&self) -> Result<String, ProcessError> {
        Ok("scripted".to_string())
    }
}

/// A started jukebox over `tool`, with all state under `home`
pub async fn jukebox(home: &Path, tool: Arc<ScriptedTool>) -> Jukebox {
    let config = config(home);
    paths::ensure_dirs(&config).unwrap();
    let jukebox = Jukebox::with_tool(&config, tool).unwrap();
    jukebox.start().await.unwrap();
    jukebox
}

pub fn config(home: &Path) -> ResolvedConfig {
    let mut config = ResolvedConfig::with_home(home);
    config.music.max_song_duration_seconds = 600;
    config.download.file_watch_timeout_seconds = 5;
    config
}

pub fn temp_home() -> TempDir {
    TempDir::new().unwrap()
}
