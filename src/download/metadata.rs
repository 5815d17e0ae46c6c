//! Metadata resolver.
//!
//! Runs the media tool in metadata-only mode and turns its output into an
//! unblocked `CacheEntry` (no local data yet) or an age-restricted sentinel.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::adapters::{MediaTool, ProcessOutput};
use crate::core::error::MusicError;
use crate::domain::{sanitize, shorten, BlockReason, CacheEntry};

/// Diagnostic printed when the media needs an age-verified account
pub const AGE_GATE_MARKER: &str = "Sign in to confirm your age";

/// Placeholder for unknown text fields
pub const UNKNOWN: &str = "N/A";

/// Resolves title, channel and duration for a URL
#[derive(Clone)]
pub struct MetadataResolver {
    tool: Arc<dyn MediaTool>,
}

impl MetadataResolver {
    pub fn new(tool: Arc<dyn MediaTool>) -> Self {
        Self { tool }
    }

    /// Fetch metadata for `url`.
    ///
    /// Returns a blocked age-restricted sentinel if the tool reports an age
    /// gate, otherwise an unblocked entry without local data.
    pub async fn fetch_metadata(&self, url: &str) -> Result<CacheEntry, MusicError> {
        let id = shorten(url)?;
        debug!(id = %id, tool = self.tool.name(), "Fetching metadata");

        // The tool only ever sees the bare watch URL
        let output = self.tool.fetch_metadata(&sanitize(url)).await?;
        if !output.success() {
            debug!(id = %id, exit_code = ?output.exit_code, "Metadata run exited non-zero");
        }

        match parse_metadata(&output) {
            Some(Metadata::AgeRestricted) => {
                info!(id = %id, "Media is age restricted");
                let mut entry = CacheEntry::new(id, url, UNKNOWN, UNKNOWN, 0.0);
                entry.block(BlockReason::AgeRestricted);
                Ok(entry)
            }
            Some(Metadata::Object(object)) => {
                let title = text_field(&object, "title");
                let artist = text_field(&object, "channel");
                let duration = object
                    .get("duration")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| {
                        warn!(id = %id, "Metadata has no numeric duration");
                        MusicError::MetadataExtractionFailed {
                            url: url.to_string(),
                            reason: "duration missing or not a number".to_string(),
                        }
                    })?;

                info!(id = %id, title = %title, duration, "Resolved metadata");
                Ok(CacheEntry::new(id, url, title, artist, duration))
            }
            None => {
                warn!(id = %id, "No metadata JSON in tool output");
                Err(MusicError::MetadataExtractionFailed {
                    url: url.to_string(),
                    reason: "no JSON object with a title on stdout or stderr".to_string(),
                })
            }
        }
    }
}

#[derive(Debug)]
enum Metadata {
    AgeRestricted,
    Object(Map<String, Value>),
}

/// Scan stdout then stderr for an age gate or the first JSON object with a title
fn parse_metadata(output: &ProcessOutput) -> Option<Metadata> {
    for line in output.lines() {
        if line.contains(AGE_GATE_MARKER) {
            return Some(Metadata::AgeRestricted);
        }

        let Ok(object) = serde_json::from_str::<Map<String, Value>>(line.trim()) else {
            continue;
        };
        if object.contains_key("title") {
            return Some(Metadata::Object(object));
        }
    }
    None
}

fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => UNKNOWN.to_string(),
        Some(other) => other.to_string(),
    }
}
