use crate::error::ConfigError;
use log::LevelFilter;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for one collector invocation
///
/// Every field has a default, so an empty TOML file (or no file at all)
/// yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database holding already reported errors
    pub storage_path: PathBuf,
    /// Default log verbosity (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    /// Path of the diagnostic endpoint on each server
    pub endpoint_path: String,
    /// Per-request timeout for log fetches
    pub request_timeout_secs: u64,
    /// Alert delivery settings
    pub alerts: AlertConfig,
    /// Server addresses per cluster name
    pub clusters: BTreeMap<String, Vec<String>>,
}

/// Alert delivery settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertConfig {
    /// External command (program plus leading arguments) that receives
    /// the alert text as its last argument. Alerts are only logged when unset.
    pub command: Option<Vec<String>>,
    /// Cap on notifications per minute; unlimited when unset
    pub max_per_minute: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./log_err.db"),
            log_level: "info".to_string(),
            endpoint_path: "loglast".to_string(),
            request_timeout_secs: 10,
            alerts: AlertConfig::default(),
            clusters: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML for this schema and
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level_filter()?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.endpoint_path.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoint_path must not be empty".to_string(),
            ));
        }

        if let Some(ref command) = self.alerts.command {
            if command.first().map_or(true, |program| program.is_empty()) {
                return Err(ConfigError::ValidationError(
                    "alerts.command must name a program".to_string(),
                ));
            }
        }

        if self.alerts.max_per_minute == Some(0) {
            return Err(ConfigError::ValidationError(
                "alerts.max_per_minute must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed form of `log_level`
    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level).map_err(|_| {
            ConfigError::ValidationError(format!("unknown log_level: {}", self.log_level))
        })
    }

    /// Per-request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
