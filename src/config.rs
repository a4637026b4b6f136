//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! spotter-config.toml file. Every section is optional; anything left out
//! takes the defaults below, which match the production deployment.
//!
//! ```toml
//! [engine]
//! days_ahead = 3
//! daytime_start_hour = 8   # exclusive
//! daytime_end_hour = 20    # inclusive
//! min_run_length = 4
//! filter_temperature = true
//! batch_size = 100
//! dry_run = false
//!
//! [forecast]
//! api_url = "https://api.open-meteo.com/v1/forecast"
//! wind_speed_unit = "kn"
//!
//! [delivery]
//! from_email = "Wind Spotter <spots@example.com>"
//! base_url = "https://spotter.example.com"
//!
//! [store]
//! path = "spots.json"
//! ```
//!
//! Secrets never live in the file: the delivery API key is read from the
//! environment variable named by `delivery.api_key_env`.

use crate::daytime::DaytimeWindow;
use crate::dispatch::MAX_BATCH_SIZE;
use crate::window::DEFAULT_MIN_RUN_LENGTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "spotter-config.toml";

/// Environment variable that forces dry-run when set to a truthy value.
pub const SKIP_DELIVERY_ENV: &str = "SKIP_EMAIL_DELIVERY";

/// Open-Meteo serves at most 16 forecast days.
const MAX_DAYS_AHEAD: i64 = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file format: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration loaded from spotter-config.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Matching and dispatch behaviour
    pub engine: EngineConfig,
    /// Forecast provider settings
    pub forecast: ForecastConfig,
    /// Email provider settings
    pub delivery: DeliveryConfig,
    /// Subscription snapshot location
    pub store: StoreConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Matching and dispatch behaviour
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many days after the run date the alert looks at
    pub days_ahead: i64,
    /// Local hour after which daytime starts (exclusive)
    pub daytime_start_hour: u32,
    /// Last local hour still counted as daytime (inclusive)
    pub daytime_end_hour: u32,
    /// Consecutive viable hours needed for an alert
    pub min_run_length: usize,
    /// Honour subscribers' minimum temperature; when off, temperature is ignored
    pub filter_temperature: bool,
    /// Messages per delivery call, at most 100
    pub batch_size: usize,
    /// Compute everything but never hand messages to the dispatcher
    pub dry_run: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let daytime = DaytimeWindow::default();
        Self {
            days_ahead: 3,
            daytime_start_hour: daytime.start_hour_exclusive,
            daytime_end_hour: daytime.end_hour_inclusive,
            min_run_length: DEFAULT_MIN_RUN_LENGTH,
            filter_temperature: true,
            batch_size: MAX_BATCH_SIZE,
            dry_run: false,
        }
    }
}

impl EngineConfig {
    pub fn daytime(&self) -> DaytimeWindow {
        DaytimeWindow {
            start_hour_exclusive: self.daytime_start_hour,
            end_hour_inclusive: self.daytime_end_hour,
        }
    }
}

/// Forecast provider settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub api_url: String,
    /// Unit for wind speed; subscriber rules are expressed in the same unit
    pub wind_speed_unit: String,
    pub request_timeout_secs: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            wind_speed_unit: "kn".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl ForecastConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Email provider settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub api_url: String,
    /// Sender identity, e.g. `Wind Spotter <spots@example.com>`
    pub from_email: String,
    /// Public site URL, used for unsubscribe links
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com".to_string(),
            from_email: "Wind Spotter <spots@localhost>".to_string(),
            base_url: "http://localhost:3000".to_string(),
            api_key_env: "RESEND_API_KEY".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl DeliveryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

/// Subscription snapshot location
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("spots.json"),
        }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter; `RUST_LOG` wins when set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from spotter-config.toml in the working directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from the specified path.
    /// A missing file yields the defaults; an unreadable, unparsable or
    /// invalid one is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str::<Config>(&contents)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Save current configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply process-wide overrides from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_skip_delivery(std::env::var(SKIP_DELIVERY_ENV).ok().as_deref());
    }

    fn apply_skip_delivery(&mut self, value: Option<&str>) {
        let truthy = value
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if truthy {
            self.engine.dry_run = true;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if !(0..=MAX_DAYS_AHEAD).contains(&engine.days_ahead) {
            return Err(ConfigError::Invalid(format!(
                "engine.days_ahead must be between 0 and {MAX_DAYS_AHEAD}, got {}",
                engine.days_ahead
            )));
        }
        if engine.daytime_end_hour > 23 || engine.daytime_start_hour >= engine.daytime_end_hour {
            return Err(ConfigError::Invalid(format!(
                "daytime window ({}, {}] is empty or out of range",
                engine.daytime_start_hour, engine.daytime_end_hour
            )));
        }
        if engine.min_run_length == 0 {
            return Err(ConfigError::Invalid(
                "engine.min_run_length must be at least 1".to_string(),
            ));
        }
        if engine.batch_size == 0 || engine.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "engine.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                engine.batch_size
            )));
        }
        if self.forecast.request_timeout_secs == 0 || self.delivery.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.days_ahead, 3);
        assert_eq!(config.engine.min_run_length, 4);
        assert_eq!(config.engine.batch_size, 100);
        assert_eq!(config.engine.daytime(), DaytimeWindow::default());
        assert_eq!(config.forecast.wind_speed_unit, "kn");
        assert!(!config.engine.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.engine.min_run_length = 3;
        config.delivery.base_url = "https://spotter.example".to_string();

        config.save(file.path()).unwrap();
        let parsed = Config::load_from_path(file.path()).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[engine]\ndry_run = true\n").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert!(config.engine.dry_run);
        assert_eq!(config.engine.batch_size, 100);
        assert_eq!(config.store.path, PathBuf::from("spots.json"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[engine\n").unwrap();
        assert!(matches!(
            Config::load_from_path(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_batch_size_ceiling_enforced() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[engine]\nbatch_size = 101\n").unwrap();
        assert!(matches!(
            Config::load_from_path(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_inverted_daytime_rejected() {
        let mut config = Config::default();
        config.engine.daytime_start_hour = 20;
        config.engine.daytime_end_hour = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_skip_delivery_override() {
        let mut config = Config::default();
        config.apply_skip_delivery(Some("false"));
        assert!(!config.engine.dry_run);
        config.apply_skip_delivery(None);
        assert!(!config.engine.dry_run);
        config.apply_skip_delivery(Some("TRUE"));
        assert!(config.engine.dry_run);
    }
}
