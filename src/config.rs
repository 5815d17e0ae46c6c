//! Configuration for songq.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SONGQ_HOME, SONGQ_DOWNLOAD_DIR)
//! 2. Config file (.songq/config.yaml)
//! 3. Defaults (~/.songq)
//!
//! Config file discovery:
//! - Searches current directory and parents for .songq/config.yaml
//! - `paths.home` is relative to the .songq/ directory, other paths are
//!   relative to the project root (the parent of .songq/)

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::ytdlp::DEFAULT_OUTPUT_TEMPLATE;
use crate::adapters::CookieSource;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_MAX_SONG_DURATION_SECONDS: u64 = 600;
pub const DEFAULT_FILE_WATCH_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_BIND: &str = "127.0.0.1:8420";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub music: Option<MusicConfig>,
    #[serde(default)]
    pub download: Option<DownloadConfig>,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .songq/)
    pub home: Option<String>,
    /// Download directory (relative to project root)
    pub download_dir: Option<String>,
    pub cache_file: Option<String>,
    pub queue_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MusicConfig {
    pub max_song_duration_seconds: Option<u64>,
    pub cookies_from_browser: Option<CookieSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    pub binary: Option<String>,
    pub output_template: Option<String>,
    pub file_watch_timeout_seconds: Option<u64>,
    pub process_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Where downloaded audio lands
    pub download_dir: PathBuf,
    /// Saved cache entries
    pub cache_file: PathBuf,
    /// Saved queue
    pub queue_file: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub music: MusicSettings,
    pub download: DownloadSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone)]
pub struct MusicSettings {
    pub max_song_duration_seconds: u64,
    pub cookies_from_browser: CookieSource,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            max_song_duration_seconds: DEFAULT_MAX_SONG_DURATION_SECONDS,
            cookies_from_browser: CookieSource::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// yt-dlp binary name or path
    pub binary: String,
    pub output_template: String,
    pub file_watch_timeout_seconds: u64,
    /// None means downloads may run indefinitely
    pub process_timeout_seconds: Option<u64>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            file_watch_timeout_seconds: DEFAULT_FILE_WATCH_TIMEOUT_SECONDS,
            process_timeout_seconds: None,
        }
    }
}

impl DownloadSettings {
    pub fn file_watch_timeout(&self) -> Duration {
        Duration::from_secs(self.file_watch_timeout_seconds)
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl ResolvedConfig {
    /// Default layout rooted at `home`
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            download_dir: home.join("download"),
            cache_file: home.join("cache.json"),
            queue_file: home.join("queue.json"),
            home,
            config_file: None,
            music: MusicSettings::default(),
            download: DownloadSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".songq").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Apply a parsed config file on top of the defaults
fn apply_config_file(config_path: &Path, file: ConfigFile, default_home: PathBuf) -> ResolvedConfig {
    let songq_dir = config_path.parent().unwrap_or(Path::new("."));
    // Base directory is the parent of .songq/ (i.e., grandparent of config.yaml)
    let base_dir = songq_dir.parent().unwrap_or(Path::new("."));

    let home = match file.paths.home {
        Some(ref home_path) => resolve_path(songq_dir, home_path),
        None => default_home,
    };

    let mut resolved = ResolvedConfig::with_home(home);
    resolved.config_file = Some(config_path.to_path_buf());

    if let Some(ref dir) = file.paths.download_dir {
        resolved.download_dir = resolve_path(base_dir, dir);
    }
    if let Some(ref cache) = file.paths.cache_file {
        resolved.cache_file = resolve_path(base_dir, cache);
    }
    if let Some(ref queue) = file.paths.queue_file {
        resolved.queue_file = resolve_path(base_dir, queue);
    }

    if let Some(music) = file.music {
        if let Some(max) = music.max_song_duration_seconds {
            resolved.music.max_song_duration_seconds = max;
        }
        if let Some(cookies) = music.cookies_from_browser {
            resolved.music.cookies_from_browser = cookies;
        }
    }

    if let Some(download) = file.download {
        if let Some(binary) = download.binary {
            resolved.download.binary = binary;
        }
        if let Some(template) = download.output_template {
            resolved.download.output_template = template;
        }
        if let Some(timeout) = download.file_watch_timeout_seconds {
            resolved.download.file_watch_timeout_seconds = timeout;
        }
        resolved.download.process_timeout_seconds = download.process_timeout_seconds;
    }

    if let Some(bind) = file.server.and_then(|s| s.bind) {
        resolved.server.bind = bind;
    }

    resolved
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".songq");

    let mut resolved = match find_config_file() {
        Some(config_path) => {
            let file = load_config_file(&config_path)?;
            apply_config_file(&config_path, file, default_home)
        }
        None => ResolvedConfig::with_home(default_home),
    };

    if let Ok(env_home) = std::env::var("SONGQ_HOME") {
        let env_home = PathBuf::from(env_home);
        // Keep file-configured locations, move the defaults along with home
        let defaults = ResolvedConfig::with_home(&resolved.home);
        if resolved.download_dir == defaults.download_dir {
            resolved.download_dir = env_home.join("download");
        }
        if resolved.cache_file == defaults.cache_file {
            resolved.cache_file = env_home.join("cache.json");
        }
        if resolved.queue_file == defaults.queue_file {
            resolved.queue_file = env_home.join("queue.json");
        }
        resolved.home = env_home;
    }

    if let Ok(env_download) = std::env::var("SONGQ_DOWNLOAD_DIR") {
        resolved.download_dir = PathBuf::from(env_download);
    }

    Ok(resolved)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_for_home() {
        let config = ResolvedConfig::with_home("/srv/songq");
        assert_eq!(config.download_dir, PathBuf::from("/srv/songq/download"));
        assert_eq!(config.cache_file, PathBuf::from("/srv/songq/cache.json"));
        assert_eq!(config.queue_file, PathBuf::from("/srv/songq/queue.json"));
        assert_eq!(config.music.max_song_duration_seconds, 600);
        assert_eq!(config.music.cookies_from_browser, CookieSource::None);
        assert_eq!(config.download.binary, "yt-dlp");
        assert_eq!(config.download.file_watch_timeout(), Duration::from_secs(300));
        assert!(config.download.process_timeout().is_none());
        assert_eq!(config.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let songq_dir = temp.path().join(".songq");
        std::fs::create_dir_all(&songq_dir).unwrap();

        let config_path = songq_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./
  download_dir: music/download
music:
  max_song_duration_seconds: 420
  cookies_from_browser: firefox
download:
  binary: /opt/bin/yt-dlp
  file_watch_timeout_seconds: 60
  process_timeout_seconds: 900
server:
  bind: 0.0.0.0:9000
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.paths.download_dir, Some("music/download".to_string()));

        let resolved = apply_config_file(&config_path, parsed, PathBuf::from("/unused"));
        assert_eq!(resolved.home, songq_dir.canonicalize().unwrap());
        assert_eq!(resolved.download_dir, temp.path().join("music/download"));
        assert_eq!(resolved.cache_file, resolved.home.join("cache.json"));
        assert_eq!(resolved.music.max_song_duration_seconds, 420);
        assert_eq!(resolved.music.cookies_from_browser, CookieSource::Firefox);
        assert_eq!(resolved.download.binary, "/opt/bin/yt-dlp");
        assert_eq!(resolved.download.file_watch_timeout_seconds, 60);
        assert_eq!(resolved.download.process_timeout(), Some(Duration::from_secs(900)));
        assert_eq!(resolved.server.bind, "0.0.0.0:9000");
        assert_eq!(resolved.config_file, Some(config_path));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
