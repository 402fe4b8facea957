//! Configuration loader and validator
//!
//! Loads settings from a TOML file. Every key is optional; missing keys fall
//! back to the built-in defaults.

use crate::xinput::{ServerVersion, REQUIRED_SERVER_VERSION};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Config file looked up when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "configs/default.toml";

/// Upper bound for `settle_delay_ms`
const MAX_SETTLE_DELAY_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Name given to the second seat's primary pair
    #[serde(default = "default_seat_name")]
    pub seat_name: String,

    /// Pause after a device is reconnected, before looking for it
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Executable used to talk to the X server
    #[serde(default = "default_xinput_command")]
    pub xinput_command: String,

    /// Oldest accepted xserver-xorg-core version
    #[serde(default = "default_min_server_version")]
    pub min_server_version: String,

    /// Remove a freshly created pair again if reattaching devices to it fails
    #[serde(default = "default_true")]
    pub cleanup_on_failure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seat_name: default_seat_name(),
            settle_delay_ms: default_settle_delay_ms(),
            xinput_command: default_xinput_command(),
            min_server_version: default_min_server_version(),
            cleanup_on_failure: true,
        }
    }
}

fn default_seat_name() -> String { "secondseat".to_string() }
fn default_settle_delay_ms() -> u64 { 500 }
fn default_xinput_command() -> String { "xinput".to_string() }
fn default_min_server_version() -> String { REQUIRED_SERVER_VERSION.to_string() }
fn default_true() -> bool { true }

impl Settings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn required_version(&self) -> Result<ServerVersion, ConfigError> {
        self.min_server_version
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("min_server_version: {}", e)))
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml(&content)?;
        debug!("  - Seat name: '{}'", config.settings.seat_name);
        debug!("  - Settle delay: {} ms", config.settings.settle_delay_ms);
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_PATH`] if it exists, else
    /// the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => Self::load(DEFAULT_CONFIG_PATH),
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.settings;

        if s.seat_name.trim().is_empty() {
            return Err(ConfigError::Invalid("seat_name must not be empty".into()));
        }

        if s.xinput_command.trim().is_empty() {
            return Err(ConfigError::Invalid("xinput_command must not be empty".into()));
        }

        if s.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "settle_delay_ms must be at most {}",
                MAX_SETTLE_DELAY_MS
            )));
        }

        s.required_version()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.seat_name, "secondseat");
        assert_eq!(settings.settle_delay(), Duration::from_millis(500));
        assert_eq!(settings.xinput_command, "xinput");
        assert_eq!(settings.min_server_version, "1.20");
        assert!(settings.cleanup_on_failure);
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.settings.seat_name, "secondseat");
    }

    #[test]
    fn test_partial_settings() {
        let config = Config::from_toml(
            r#"
            [settings]
            seat_name = "guest"
            settle_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.settings.seat_name, "guest");
        assert_eq!(config.settings.settle_delay(), Duration::ZERO);
        assert_eq!(config.settings.xinput_command, "xinput");
    }

    #[test]
    fn test_invalid_seat_name() {
        let result = Config::from_toml("[settings]\nseat_name = \"  \"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_settle_delay() {
        let result = Config::from_toml("[settings]\nsettle_delay_ms = 120000\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_min_version() {
        let result = Config::from_toml("[settings]\nmin_server_version = \"one.twenty\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = Config::from_toml("[settings\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
