//! Layered configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML config file,
//! `RPCD_*` environment variables, then command-line flags.

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rpc::framing::DEFAULT_MAX_FRAME_BYTES;

pub const DEFAULT_CONFIG_FILE: &str = "rpcd.toml";
pub const ENV_PREFIX: &str = "RPCD_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub idle_timeout_secs: u64,
    /// Upper bound on the idle supervisor's sleep between checks
    pub poll_interval_ms: u64,
    pub max_frame_bytes: usize,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            idle_timeout_secs: 60,
            poll_interval_ms: 1000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            verbose: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load the configuration, merging `overrides` (usually CLI flags) last.
    ///
    /// A missing config file is not an error.
    pub fn new<T: Serialize>(file: Option<&Path>, overrides: Option<&T>) -> Result<Self, ConfigError> {
        let file = file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid("idle_timeout_secs must be > 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
        }
        if self.max_frame_bytes < 64 {
            return Err(ConfigError::Invalid("max_frame_bytes must be >= 64".into()));
        }
        Ok(())
    }

    /// `host:port`, resolved when binding or connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_overrides() -> Option<&'static HashMap<String, String>> {
        None
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.address(), "localhost:8000");
        assert_eq!(config.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_then_overrides_take_precedence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rpcd.toml");
        std::fs::write(&path, "port = 9100\nidle_timeout_secs = 5\n").unwrap();

        let config = AppConfig::new(Some(&path), no_overrides()).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.idle_timeout_secs, 5);
        assert_eq!(config.host, "localhost");

        let overrides = HashMap::from([("port".to_string(), 9200)]);
        let config = AppConfig::new(Some(&path), Some(&overrides)).unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.idle_timeout_secs, 5);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = AppConfig::new(Some(&path), no_overrides()).unwrap();
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rpcd.toml");
        std::fs::write(&path, "idle_timeout_secs = 0\n").unwrap();

        let err = AppConfig::new(Some(&path), no_overrides()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
