//! Configuration module for the Aimon monitor.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `AIMON_API_URL` | Yes | - | Base URL of the usage reporting API |
//! | `AIMON_STATE_DIR` | No | `~/.aimon` | Directory holding settings, employee list and badge state |
//! | `AIMON_WEBHOOK_URL` | No | - | Webhook endpoint for KPI notifications (log-only when unset) |
//! | `AIMON_HTTP_TIMEOUT_SECS` | No | 30 | Timeout for reporting API requests |
//!
//! # Example
//!
//! ```no_run
//! use aimon::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("API URL: {}", config.api_url);
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

/// Default state directory name relative to home.
const DEFAULT_STATE_DIR: &str = ".aimon";

/// Default timeout for reporting API requests (in seconds).
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Configuration for the Aimon monitor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the usage reporting API (e.g. `https://reports.internal.example`).
    pub api_url: String,

    /// Directory holding the persistent key-value store and badge state.
    pub state_dir: PathBuf,

    /// Optional webhook endpoint for KPI notifications.
    ///
    /// When `None`, notifications are emitted through the log output only.
    pub webhook_url: Option<String>,

    /// Timeout applied to reporting API requests.
    pub http_timeout: Duration,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `AIMON_API_URL` is not set
    /// - `AIMON_HTTP_TIMEOUT_SECS` is set but is not a positive integer
    /// - The home directory cannot be determined (needed for the default state dir)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Required: AIMON_API_URL
        let api_url = env::var("AIMON_API_URL")
            .map_err(|_| ConfigError::MissingEnvVar("AIMON_API_URL".to_string()))?;

        // Optional: AIMON_STATE_DIR (default: ~/.aimon)
        let state_dir = match env::var("AIMON_STATE_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_state_dir()?,
        };

        // Optional: AIMON_WEBHOOK_URL (default: none = log-only notifications)
        let webhook_url = env::var("AIMON_WEBHOOK_URL").ok().filter(|s| !s.is_empty());

        // Optional: AIMON_HTTP_TIMEOUT_SECS (default: 30, must be >= 1)
        let http_timeout = match env::var("AIMON_HTTP_TIMEOUT_SECS") {
            Ok(val) => {
                let secs = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    key: "AIMON_HTTP_TIMEOUT_SECS".to_string(),
                    message: format!("expected positive integer, got '{val}'"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "AIMON_HTTP_TIMEOUT_SECS".to_string(),
                        message: "timeout must be at least 1 second".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            state_dir,
            webhook_url,
            http_timeout,
        })
    }
}

/// Resolves the default state directory (`~/.aimon`).
pub fn default_state_dir() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(base_dirs.home_dir().join(DEFAULT_STATE_DIR))
}
