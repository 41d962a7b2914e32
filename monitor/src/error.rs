//! Error types for the Aimon monitor.
//!
//! This module defines the error types used throughout the monitor crate,
//! providing structured error handling with clear, human-readable messages.

use thiserror::Error;

use crate::config::ConfigError;
use crate::notifier::NotifyError;

/// Errors that can occur during monitor operations.
///
/// This is the primary error type for the monitor crate, encompassing all
/// possible failure modes.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The reporting API answered but flagged the request as unsuccessful.
    #[error("reporting API error: {0}")]
    Api(String),

    /// Storage change watcher error.
    #[error("storage watch error: {0}")]
    Watch(String),

    /// Notification delivery error.
    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
