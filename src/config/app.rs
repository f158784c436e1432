//! Application configuration loading from config.toml and the environment.
//!
//! Everything except the provider API key lives in `config.toml`; the key is
//! a secret and comes from the `SMM_PROVIDER_API_KEY` environment variable
//! (loaded through `.env` in development). Scheduler settings all have
//! defaults, so a minimal config file only names the provider endpoint.

use crate::core::status::StatusMap;
use crate::errors::{Error, Result};
use crate::scheduler::SchedulerConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the provider API key.
const API_KEY_VAR: &str = "SMM_PROVIDER_API_KEY";

/// The parsed config.toml file.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Upstream provider endpoint
    pub provider: ProviderConfig,
    /// Reconciliation cadence; all fields optional
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Extra provider-status-string to order-status mappings
    #[serde(default)]
    pub status_map: HashMap<String, String>,
}

/// Provider endpoint configuration. The API key is deliberately NOT a config
/// file field.
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    /// Full URL of the provider API endpoint
    pub api_url: String,
}

/// Scheduler settings as written in config.toml.
#[derive(Debug, Deserialize, Default)]
pub struct SchedulerSettings {
    pub poll_interval_secs: Option<u64>,
    pub poll_batch: Option<u64>,
    pub retry_interval_secs: Option<u64>,
    pub retry_batch: Option<u64>,
    pub retry_window_hours: Option<i64>,
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `Error::Config` if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
            message: format!("Failed to read config file: {e}"),
        })?;

        toml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("Failed to parse config.toml: {e}"),
        })
    }

    /// Loads configuration from the default location (./config.toml).
    pub fn load_default() -> Result<Self> {
        Self::load("config.toml")
    }

    /// Reads the provider API key from the environment.
    pub fn provider_api_key() -> Result<String> {
        std::env::var(API_KEY_VAR).map_err(|_| Error::Config {
            message: format!("{API_KEY_VAR} must be set"),
        })
    }

    /// The scheduler configuration with defaults applied.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let defaults = SchedulerConfig::default();
        SchedulerConfig {
            poll_interval: self
                .scheduler
                .poll_interval_secs
                .map_or(defaults.poll_interval, Duration::from_secs),
            poll_batch: self.scheduler.poll_batch.unwrap_or(defaults.poll_batch),
            retry_interval: self
                .scheduler
                .retry_interval_secs
                .map_or(defaults.retry_interval, Duration::from_secs),
            retry_batch: self.scheduler.retry_batch.unwrap_or(defaults.retry_batch),
            retry_window: self
                .scheduler
                .retry_window_hours
                .map_or(defaults.retry_window, chrono::Duration::hours),
        }
    }

    /// The status mapping table with configured overrides applied.
    pub fn status_map(&self) -> Result<StatusMap> {
        StatusMap::with_overrides(&self.status_map)
    }
}
