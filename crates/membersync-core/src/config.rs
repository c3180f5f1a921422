//! Configuration module for membersync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, defaults, and platform-appropriate default paths.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for membersync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Downstream system connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the downstream member API.
    pub base_url: String,
    /// API key; when `None` it is read from the `MEMBERSYNC_API_KEY`
    /// environment variable at startup.
    pub api_key: Option<String>,
    /// Fixed per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retries for server errors (5xx).
    pub max_retries: u32,
}

/// Local tracking store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

/// Reconciliation run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Fixed delay between records, in milliseconds. Rate-limiting
    /// courtesy to the remote system; records are pushed strictly
    /// sequentially regardless.
    pub record_delay_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/membersync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("membersync")
            .join("config.yaml")
    }

    /// Resolves the API key from config or the environment.
    pub fn api_key(&self) -> Option<String> {
        self.remote
            .api_key
            .clone()
            .or_else(|| std::env::var("MEMBERSYNC_API_KEY").ok())
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("membersync")
                .join("membersync.db"),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            record_delay_ms: 250,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.remote.max_retries, 3);
        assert_eq!(config.sync.record_delay_ms, 250);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_partial_yaml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "remote:\n  base_url: https://portal.example.com/api\n  max_retries: 5"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.remote.base_url, "https://portal.example.com/api");
        assert_eq!(config.remote.max_retries, 5);
        // Unspecified sections keep their defaults
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.sync.record_delay_ms, 250);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(config.logging.level, "info");
    }
}
