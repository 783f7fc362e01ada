//! Client configuration.
//!
//! Loaded with priority: environment variables > YAML config file > defaults.
//! A missing `server_url` is a valid configuration - the client then runs in
//! local-only mode against the fallback cache.

use serde::Deserialize;
use std::path::PathBuf;

/// Sync client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Draft store server URL. `None` means local-only editing.
    pub server_url: Option<String>,
    /// Directory for the fallback cache and the editor identity file.
    pub data_dir: PathBuf,
    /// Seconds between store polls.
    pub poll_interval_secs: u64,
    /// Milliseconds of quiet time before a local edit is persisted.
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            data_dir: Self::default_data_dir(),
            poll_interval_secs: 5,
            debounce_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        if let Ok(url) = std::env::var("DRAFTSYNC_SERVER_URL") {
            config.server_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Ok(dir) = std::env::var("DRAFTSYNC_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Returns true when a draft store server is configured.
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some()
    }

    /// Default config file path: `<config dir>/draftsync/config.yaml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("draftsync")
            .join("config.yaml")
    }

    /// Default data directory: `<data dir>/draftsync`
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("draftsync")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
