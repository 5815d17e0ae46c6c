//! yt-dlp adapter.
//!
//! Subprocess mode only: every call spawns the `yt-dlp` binary and captures
//! its output for the resolver/orchestrator to parse.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::process::{run_captured, ProcessError, ProcessOutput};
use super::MediaTool;

/// Output template printing exactly one JSON object per URL
pub const METADATA_TEMPLATE: &str =
    r#"{"title": %(title)j, "channel": %(channel)j, "duration": %(duration)j}"#;

/// Audio format preference for downloads
pub const AUDIO_FORMAT_SELECTOR: &str = "bestaudio[ext=m4a]/bestaudio[ext=mp3]";

/// Default file name template inside the download directory
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Browser to borrow cookies from (for age-gated or region-locked media)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieSource {
    #[default]
    None,
    Brave,
    Chrome,
    Chromium,
    Edge,
    Firefox,
    Opera,
    Safari,
    Vivaldi,
    Whale,
}

impl CookieSource {
    /// Browser name as yt-dlp expects it, None for no cookies
    pub fn browser_name(&self) -> Option<&'static str> {
        match self {
            CookieSource::None => None,
            CookieSource::Brave => Some("brave"),
            CookieSource::Chrome => Some("chrome"),
            CookieSource::Chromium => Some("chromium"),
            CookieSource::Edge => Some("edge"),
            CookieSource::Firefox => Some("firefox"),
            CookieSource::Opera => Some("opera"),
            CookieSource::Safari => Some("safari"),
            CookieSource::Vivaldi => Some("vivaldi"),
            CookieSource::Whale => Some("whale"),
        }
    }
}

impl std::str::FromStr for CookieSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "" | "none" => Ok(CookieSource::None),
            "brave" => Ok(CookieSource::Brave),
            "chrome" => Ok(CookieSource::Chrome),
            "chromium" => Ok(CookieSource::Chromium),
            "edge" => Ok(CookieSource::Edge),
            "firefox" => Ok(CookieSource::Firefox),
            "opera" => Ok(CookieSource::Opera),
            "safari" => Ok(CookieSource::Safari),
            "vivaldi" => Ok(CookieSource::Vivaldi),
            "whale" => Ok(CookieSource::Whale),
            _ => anyhow::bail!("Unknown cookie source: {}", s),
        }
    }
}

/// yt-dlp adapter using subprocess mode
#[derive(Debug, Clone)]
pub struct YtDlp {
    /// Path to the yt-dlp binary (default: "yt-dlp")
    binary_path: String,

    cookies: CookieSource,

    output_template: String,

    /// Optional limit on each invocation
    timeout: Option<Duration>,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    /// Create an adapter using `yt-dlp` from PATH
    pub fn new() -> Self {
        Self::with_binary_path("yt-dlp")
    }

    /// Create an adapter with a custom binary path
    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            cookies: CookieSource::None,
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            timeout: None,
        }
    }

    pub fn with_cookies(mut self, cookies: CookieSource) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = template.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn push_cookie_args(&self, args: &mut Vec<String>) {
        if let Some(browser) = self.cookies.browser_name() {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.to_string());
        }
    }

    /// Arguments for metadata-only mode
    pub fn metadata_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["--print".to_string(), METADATA_TEMPLATE.to_string()];
        self.push_cookie_args(&mut args);
        args.push(url.to_string());
        args
    }

    /// Arguments for download mode
    pub fn download_args(&self, url: &str, target_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            AUDIO_FORMAT_SELECTOR.to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "-P".to_string(),
            target_dir.to_string_lossy().to_string(),
            "-o".to_string(),
            self.output_template.clone(),
        ];
        self.push_cookie_args(&mut args);
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaTool for YtDlp {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<ProcessOutput, ProcessError> {
        run_captured(&self.binary_path, &self.metadata_args(url), self.timeout).await
    }

    async fn download(&self, url: &str, target_dir: &Path) -> Result<ProcessOutput, ProcessError> {
        run_captured(&self.binary_path, &self.download_args(url, target_dir), self.timeout).await
    }

    async fn health_check(&self) -> Result<String, ProcessError> {
        let output = run_captured(&self.binary_path, &["--version".to_string()], self.timeout).await?;
        Ok(output.stdout.first().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_metadata_args_without_cookies() {
        let tool = YtDlp::new();
        let args = tool.metadata_args("https://youtu.be/AAAAAAAAAAA");
        assert_eq!(
            args,
            vec![
                "--print".to_string(),
                METADATA_TEMPLATE.to_string(),
                "https://youtu.be/AAAAAAAAAAA".to_string(),
            ]
        );
    }

    #[test]
    fn test_cookie_args_precede_url() {
        let tool = YtDlp::new().with_cookies(CookieSource::Firefox);
        let args = tool.metadata_args("u");
        assert_eq!(&args[2..], &["--cookies-from-browser", "firefox", "u"]);

        let args = tool.download_args("u", &PathBuf::from("/dl"));
        assert_eq!(args.last().unwrap(), "u");
        assert!(args.windows(2).any(|w| w == ["--cookies-from-browser", "firefox"]));
    }

    #[test]
    fn test_download_args() {
        let tool = YtDlp::with_binary_path("/opt/yt-dlp").with_output_template("%(id)s.%(ext)s");
        let args = tool.download_args("u", &PathBuf::from("/cache/download"));
        assert_eq!(
            args,
            vec![
                "-f",
                AUDIO_FORMAT_SELECTOR,
                "--audio-format",
                "mp3",
                "-P",
                "/cache/download",
                "-o",
                "%(id)s.%(ext)s",
                "u",
            ]
        );
    }

    #[test]
    fn test_cookie_source_parsing() {
        assert_eq!("none".parse::<CookieSource>().unwrap(), CookieSource::None);
        assert_eq!("".parse::<CookieSource>().unwrap(), CookieSource::None);
        assert_eq!("Chrome".parse::<CookieSource>().unwrap(), CookieSource::Chrome);
        assert!("netscape".parse::<CookieSource>().is_err());
        assert_eq!(CookieSource::Whale.browser_name(), Some("whale"));
        assert_eq!(CookieSource::None.browser_name(), None);
    }
}
