//! Canonical media identifiers.
//!
//! Every accepted URL shape for a piece of media collapses to the same
//! 11-character id, which keys both the cache and the queue.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::MusicError;

/// Base of every sanitized watch URL
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Length of a canonical id
pub const MEDIA_ID_LEN: usize = 11;

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:youtu\.be/|youtube\.com/(?:.*v=|embed/|v/|shorts/|live/))([a-zA-Z0-9_-]{11})")
            .expect("media id pattern is valid")
    })
}

/// Canonical 11-character media id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    /// Extract the canonical id from any recognized URL shape
    pub fn from_url(url: &str) -> Result<Self, MusicError> {
        id_pattern()
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| MusicError::NotRecognizedUrl(url.to_string()))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Minimal watch URL for this id
    pub fn watch_url(&self) -> String {
        format!("{}{}", WATCH_URL_PREFIX, self.0)
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MediaId {
    type Err = MusicError;

    /// Accepts either a bare 11-character id or any recognized URL
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid_bare = s.len() == MEDIA_ID_LEN
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid_bare {
            return Ok(Self(s.to_string()));
        }
        Self::from_url(s)
    }
}

/// Shorten a URL to its canonical id.
///
/// `https://youtu.be/lgzCxqQUU5g?si=OGS77kTm_KTKp8I0` → `lgzCxqQUU5g`
pub fn shorten(url: &str) -> Result<MediaId, MusicError> {
    MediaId::from_url(url)
}

/// Rebuild a minimal watch URL, dropping playlist and tracking parameters.
///
/// Unrecognized input still yields a watch URL, with an empty id.
pub fn sanitize(url: &str) -> String {
    match MediaId::from_url(url) {
        Ok(id) => id.watch_url(),
        Err(_) => {
            warn!(url, "Sanitizing unrecognized URL, result carries no id");
            WATCH_URL_PREFIX.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "lgzCxqQUU5g";

    fn shapes() -> Vec<String> {
        vec![
            format!("https://youtu.be/{ID}?si=OGS77kTm_KTKp8I0"),
            format!("https://www.youtube.com/watch?v={ID}"),
            format!("https://www.youtube.com/watch?v={ID}&list=PL0wqt_um4x0bsdViTJBmnl6KGMoSqxfZy"),
            format!("https://youtube.com/watch?feature=share&v={ID}"),
            format!("https://www.youtube.com/embed/{ID}"),
            format!("https://www.youtube.com/v/{ID}?version=3"),
            format!("https://youtube.com/shorts/{ID}"),
            format!("https://www.youtube.com/live/{ID}?feature=shared"),
            format!("https://music.youtube.com/watch?v={ID}"),
        ]
    }

    #[test]
    fn test_all_shapes_share_one_id() {
        for url in shapes() {
            assert_eq!(shorten(&url).unwrap().as_str(), ID, "url: {}", url);
        }
    }

    #[test]
    fn test_sanitize_is_stable_under_shorten() {
        for url in shapes() {
            let sanitized = sanitize(&url);
            assert_eq!(sanitized, format!("{WATCH_URL_PREFIX}{ID}"));
            assert_eq!(shorten(&sanitized).unwrap(), shorten(&url).unwrap());
        }
    }

    #[test]
    fn test_unrecognized_url() {
        let result = shorten("invalid_url");
        assert!(matches!(result, Err(MusicError::NotRecognizedUrl(_))));

        // Too short to be an id
        assert!(shorten("https://youtu.be/abc").is_err());
        assert!(shorten("https://vimeo.com/123456789012").is_err());
    }

    #[test]
    fn test_sanitize_unrecognized_keeps_placeholder() {
        assert_eq!(sanitize("invalid_url"), WATCH_URL_PREFIX);
    }

    #[test]
    fn test_parse_bare_id_or_url() {
        let bare: MediaId = ID.parse().unwrap();
        let from_url: MediaId = format!("https://youtu.be/{ID}").parse().unwrap();
        assert_eq!(bare, from_url);
        assert!("not an id".parse::<MediaId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = MediaId::from_url(&format!("https://youtu.be/{ID}")).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{ID}\""));
    }
}
