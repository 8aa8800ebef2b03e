//! Config schema for the relay.
use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{duration::parse_duration, error::Result};

/// Speech command used when none is configured.
pub const DEFAULT_COMMAND: &str = "say";
/// Per-job speech timeout used when none is configured.
pub const DEFAULT_TIMEOUT: &str = "1m";
/// Aggregator flush interval used when none is configured.
pub const DEFAULT_FLUSH_INTERVAL: &str = "1s";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    /// Executable that reads UTF-8 text on stdin and speaks it.
    pub command: String,
    /// Rules matched against channel display names.
    pub channel: ConditionConfig,
    /// Rules matched against user display names.
    pub user: ConditionConfig,
    /// Rules matched against the raw message text.
    pub keyword: ConditionConfig,
    /// Whether automated (`bot_message`) posts may be spoken.
    pub bot_message: bool,
    /// Per-job speech timeout, e.g. "1m".
    pub timeout: String,
    /// How often pending batches are flushed, e.g. "1s".
    pub flush_interval: String,
    pub utterance: UtteranceConfig,
}

impl Default for MurmurConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.into(),
            channel: ConditionConfig::default(),
            user: ConditionConfig::default(),
            keyword: ConditionConfig::default(),
            bot_message: false,
            timeout: DEFAULT_TIMEOUT.into(),
            flush_interval: DEFAULT_FLUSH_INTERVAL.into(),
            utterance: UtteranceConfig::default(),
        }
    }
}

impl MurmurConfig {
    /// Effective speech command; an empty value means the default.
    #[must_use]
    pub fn command(&self) -> &str {
        if self.command.trim().is_empty() {
            DEFAULT_COMMAND
        } else {
            self.command.trim()
        }
    }

    /// Effective speech timeout; an empty value means the default.
    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(non_empty_or(&self.timeout, DEFAULT_TIMEOUT))
    }

    /// Effective flush interval; an empty value means the default.
    pub fn flush_interval(&self) -> Result<Duration> {
        parse_duration(non_empty_or(&self.flush_interval, DEFAULT_FLUSH_INTERVAL))
    }
}

impl fmt::Display for MurmurConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(json) => f.write_str(&json),
            Err(e) => write!(f, "<unprintable config: {e}>"),
        }
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// Filter and pronunciation rules for one dimension (channel, user or keyword).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionConfig {
    /// Flat list of `find, replace` pairs applied in order.
    pub yomi: Vec<String>,
    /// Values that are always spoken, overriding every exclusion.
    pub includes: Vec<String>,
    /// Values that are never spoken unless included.
    pub excludes: Vec<String>,
}

/// Wording of the spoken fragment `"<body>. <speaker_label> <user>. <channel_label> <channel>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtteranceConfig {
    pub speaker_label: String,
    pub channel_label: String,
    /// Joins the fragments of one channel's batch.
    pub separator: String,
    /// Stand-in for names the directory cannot resolve.
    pub unknown: String,
}

impl Default for UtteranceConfig {
    fn default() -> Self {
        Self {
            speaker_label: "spoken by".into(),
            channel_label: "channel".into(),
            separator: "。".into(),
            unknown: "unknown".into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MurmurConfig::default();
        assert_eq!(config.command(), "say");
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(60));
        assert_eq!(config.flush_interval().unwrap(), Duration::from_secs(1));
        assert!(!config.bot_message);
        assert_eq!(config.utterance.separator, "。");
    }

    #[test]
    fn empty_strings_fall_back_to_defaults() {
        let config = MurmurConfig {
            command: "  ".into(),
            timeout: String::new(),
            ..Default::default()
        };
        assert_eq!(config.command(), "say");
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn display_is_pretty_json() {
        let shown = MurmurConfig::default().to_string();
        assert!(shown.contains("\"command\": \"say\""));
        assert!(shown.contains("\"bot_message\": false"));
    }
}
