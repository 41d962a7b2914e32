//! Notification delivery channels.
//!
//! The KPI evaluator only knows the [`Notifier`] trait; delivery is either
//! a structured log line ([`LogNotifier`]) or a JSON POST to a configured
//! webhook ([`WebhookNotifier`]). Delivery is fire-and-forget from the
//! evaluator's point of view: failures are logged, never propagated into
//! the check itself.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during notification delivery.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub priority: u8,
}

/// A notification delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable channel name (e.g. "log", "webhook").
    fn channel_name(&self) -> &str;
}

/// Emits notifications as log lines. The default channel.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            title = %notification.title,
            message = %notification.message,
            "KPI notification"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}

/// Delivers notifications as JSON payloads to a configured webhook URL.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    http: Client,
}

impl WebhookNotifier {
    /// Creates a webhook notifier over a shared HTTP client.
    #[must_use]
    pub fn new(url: impl Into<String>, http: Client) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .json(notification)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(url = %self.url, %status, body = %body, "webhook rejected notification");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %self.url, %status, "webhook notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}
