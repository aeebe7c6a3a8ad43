//! Pull instrumentation records out of a mixed controller log.
//!
//! Instrumented clients log through the controller's own logger, so each
//! record sits inside an ordinary log line:
//!
//! ```text
//! 2024-05-01T10:00:00Z INFO sleeveless {"LogType": "sleeve:controller-operation"}{"op_type":"GET",...}
//! ```
//!
//! Lines without the keyword are ignored. The record is the trimmed text
//! after the first keyword; its `{"LogType": ...}` tag decides which stream it
//! belongs to and is then removed. Tagged lines of an unknown type are
//! dropped.

use serde::Serialize;
use sleeve_core::config::ExtractConfig;
use tracing::debug;

/// Records split by stream, in log order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedLog {
    pub events: Vec<String>,
    pub versions: Vec<String>,
    /// Keyword lines without a known tag.
    pub dropped: usize,
}

impl ExtractedLog {
    pub fn event_lines(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    pub fn version_lines(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(String::as_str)
    }
}

fn tag(log_type: &str) -> String {
    format!(r#"{{"LogType": "{log_type}"}}"#)
}

/// Split a raw log into event and version records.
pub fn split_log(content: &str, config: &ExtractConfig) -> ExtractedLog {
    let event_tag = tag(&config.event_log_type);
    let version_tag = tag(&config.version_log_type);
    let mut out = ExtractedLog::default();

    for line in content.lines() {
        let Some((_, record)) = line.split_once(config.keyword.as_str()) else {
            continue;
        };
        let record = record.trim();

        if record.contains(&event_tag) {
            out.events.push(record.replace(&event_tag, "").trim().to_string());
        } else if record.contains(&version_tag) {
            out.versions.push(record.replace(&version_tag, "").trim().to_string());
        } else {
            out.dropped += 1;
        }
    }

    debug!(
        events = out.events.len(),
        versions = out.versions.len(),
        dropped = out.dropped,
        "extracted instrumentation records"
    );
    out
}
