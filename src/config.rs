//! Configuration for the incubator monitor.

use crate::logging::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding session log files
    pub log_dir: PathBuf,

    /// Time between logged rows
    #[serde(with = "duration_millis")]
    pub sample_interval: Duration,

    /// Rows per file before rolling over
    pub rows_per_file: u64,

    /// Maximum number of log files kept
    pub max_files: usize,

    /// Wait before warning that a superseded session is slow to exit
    #[serde(with = "duration_millis")]
    pub supersede_grace: Duration,

    /// IANA time zone for timestamps; host local time when unset
    pub timezone: Option<String>,

    /// Fixed seed for reproducible sensor noise
    pub seed: Option<u64>,

    /// HTTP port
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            log_dir: PathBuf::from("./logs"),
            sample_interval: session.sample_interval,
            rows_per_file: session.rows_per_file,
            max_files: 10,
            supersede_grace: session.supersede_grace,
            timezone: None,
            seed: None,
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("incubator-monitor")
            .join("config.json")
    }

    /// Reject settings the logger cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "sample_interval must be greater than zero".into(),
            ));
        }
        if self.rows_per_file == 0 {
            return Err(ConfigError::Invalid("rows_per_file must be at least 1".into()));
        }
        if self.max_files == 0 {
            return Err(ConfigError::Invalid("max_files must be at least 1".into()));
        }
        Ok(())
    }

    /// Session timing derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            sample_interval: self.sample_interval,
            rows_per_file: self.rows_per_file,
            supersede_grace: self.supersede_grace,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
