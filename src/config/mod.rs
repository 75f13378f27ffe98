//! Configuration management.
//!
//! Configuration is read from a TOML file and layered with environment
//! variables:
//!
//! ```toml
//! data_dir = "/var/lib/flatstore"
//! auto_load = true
//! pretty = true
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! file = "/var/log/flatstore.log"
//! ```
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `FLATSTORE_DATA_DIR` | `data_dir` |
//! | `FLATSTORE_LOG` | `logging.level` |
//! | `FLATSTORE_LOG_FORMAT` | `logging.format` |

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "FLATSTORE_DATA_DIR";
/// Environment variable overriding the log filter.
pub const ENV_LOG: &str = "FLATSTORE_LOG";
/// Environment variable overriding the log format.
pub const ENV_LOG_FORMAT: &str = "FLATSTORE_LOG_FORMAT";

/// Main configuration for flatstore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base directory stores are created under.
    pub data_dir: PathBuf,
    /// Whether stores load existing records when opened.
    pub auto_load: bool,
    /// Whether per-record files are pretty-printed.
    pub pretty: bool,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `flatstore=debug`.
    pub level: Option<String>,
    /// Output format: `text` or `json`.
    pub format: Option<String>,
    /// Append log output to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Auto-load on open.
    pub auto_load: Option<bool>,
    /// Pretty-print per-record files.
    pub pretty: Option<bool>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            auto_load: true,
            pretty: true,
            logging: LoggingSettings::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::io("read_config_file", path))?;
        Self::from_toml(&contents)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/flatstore/config.toml`.
    /// Returns the defaults if neither exists or parses.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("flatstore").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("flatstore")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), "ignoring config file: {e}"),
            }
        }

        Self::default()
    }

    /// Applies `FLATSTORE_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = non_empty(ENV_LOG) {
            self.logging.level = Some(level);
        }
        if let Some(format) = non_empty(ENV_LOG_FORMAT) {
            self.logging.format = Some(format);
        }
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Converts a `ConfigFile` to `StoreConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(auto_load) = file.auto_load {
            config.auto_load = auto_load;
        }
        if let Some(pretty) = file.pretty {
            config.pretty = pretty;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }
}

/// Default base directory: `<data_local_dir>/flatstore`, or `.flatstore`
/// when no home directory can be found.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".flatstore"),
        |b| b.data_local_dir().join("flatstore"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert!(config.auto_load);
        assert!(config.pretty);
        assert!(config.data_dir.ends_with("flatstore") || config.data_dir.ends_with(".flatstore"));
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_from_toml() {
        let config = StoreConfig::from_toml(
            r#"
            data_dir = "/tmp/records"
            pretty = false

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/records"));
        assert!(config.auto_load);
        assert!(!config.pretty);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = StoreConfig::from_toml("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, Error::OperationFailed { ref operation, .. } if operation == "parse_config_file"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "auto_load = false\n").unwrap();

        let config = StoreConfig::load_from_file(&path).unwrap();
        assert!(!config.auto_load);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = StoreConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { operation: "read_config_file", .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DATA_DIR, "/srv/data"),
            (ENV_LOG, "trace"),
            (ENV_LOG_FORMAT, "  "),
        ]);

        let config = StoreConfig::default()
            .with_overrides_from(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.logging.level.as_deref(), Some("trace"));
        assert_eq!(config.logging.format, None);
    }
}
