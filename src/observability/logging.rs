//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "flatstore=debug,info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to text for anything unknown.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr when `None`.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config settings.
    ///
    /// `verbose` raises the default filter to debug for this crate; an
    /// explicit level in the settings still wins.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let default_filter = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };

        Self {
            filter: settings
                .and_then(|s| s.level.clone())
                .unwrap_or_else(|| default_filter.to_string()),
            format: settings
                .and_then(|s| s.format.as_deref())
                .map(LogFormat::parse)
                .unwrap_or_default(),
            file: settings.and_then(|s| s.file.clone()),
        }
    }
}
