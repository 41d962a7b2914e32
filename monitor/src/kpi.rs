//! KPI evaluation: compare today's usage against the quota and nag.
//!
//! Notification copy comes from a fixed catalog of playful templates with
//! `{{current}}`, `{{target}}` and `{{target - current}}` placeholders;
//! one is picked uniformly at random per shortfall.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::notifier::{Notification, Notifier};
use crate::settings::Settings;
use crate::usage::UsageQuery;

/// Notification priority used for quota-shortfall alerts.
const KPI_NOTIFICATION_PRIORITY: u8 = 2;

/// A notification template from the fixed catalog.
#[derive(Debug, Clone, Copy)]
pub struct NotificationTemplate {
    pub title: &'static str,
    pub message: &'static str,
}

/// The fixed catalog of quota-shortfall messages.
pub const NOTIFICATION_CATALOG: [NotificationTemplate; 7] = [
    NotificationTemplate {
        title: "Hey, the AI misses you!",
        message: "You've used the AI {{current}} times today, only {{target - current}} more to clear your quota!",
    },
    NotificationTemplate {
        title: "The AI is quietly sobbing...",
        message: "Only {{current}} requests so far? Send {{target - current}} more so it stops feeling lonely 🥹",
    },
    NotificationTemplate {
        title: "Unbelievable! Barely any AI today",
        message: "People are landing on Mars and you're still at {{current}}/{{target}} AI requests. Hurry up!",
    },
    NotificationTemplate {
        title: "Ignoring the AI again 😒",
        message: "Just {{current}} requests today. {{target - current}} more before the AI talks to you again~",
    },
    NotificationTemplate {
        title: "Hello? Your AI is sitting idle",
        message: "{{current}} requests in, but the AI is still waiting on the other {{target - current}}. Don't keep it waiting!",
    },
    NotificationTemplate {
        title: "Where's the love for your AI?",
        message: "Only {{current}} requests today? The target is {{target}}. Don't let the AI down!",
    },
    NotificationTemplate {
        title: "Awaken your inner AI power!",
        message: "You're at {{current}} requests, today's goal is {{target}}. Keep going!",
    },
];

/// Substitutes placeholders in a template.
///
/// `{{target - current}}` is an integer subtraction.
#[must_use]
pub fn render_notification(
    template: &NotificationTemplate,
    current: u64,
    target: u64,
) -> Notification {
    let remaining = target.saturating_sub(current);
    let message = template
        .message
        .replace("{{target - current}}", &remaining.to_string())
        .replace("{{current}}", &current.to_string())
        .replace("{{target}}", &target.to_string());

    Notification {
        title: template.title.to_string(),
        message,
        priority: KPI_NOTIFICATION_PRIORITY,
    }
}

/// Picks a catalog entry uniformly at random and renders it.
#[must_use]
pub fn pick_notification(current: u64, target: u64) -> Notification {
    let mut rng = rand::rng();
    let idx = rng.random_range(0..NOTIFICATION_CATALOG.len());
    render_notification(&NOTIFICATION_CATALOG[idx], current, target)
}

/// Outcome of a single KPI check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiOutcome {
    /// Alerts are disabled; nothing was evaluated.
    Disabled,
    /// Today's usage meets or exceeds the quota.
    Met { current: u64, target: u64 },
    /// Usage is below quota; a notification was sent.
    Shortfall { current: u64, target: u64 },
}

/// Runs one KPI check: fetch today's usage, compare against the quota and
/// notify on shortfall.
///
/// Remote failure counts as zero usage (fail-open), so an outage surfaces
/// as a shortfall alert rather than silence. Notifier failures are logged
/// and swallowed.
pub async fn run_kpi_check(
    settings: &Settings,
    usage: &UsageQuery<'_>,
    notifier: &dyn Notifier,
) -> KpiOutcome {
    if !settings.kpi_alert {
        debug!("KPI alerts disabled, skipping check");
        return KpiOutcome::Disabled;
    }

    let target = u64::from(settings.min_request_count);
    let current = usage.today().await.or_zero();

    if current >= target {
        info!(current, target, "daily quota met");
        return KpiOutcome::Met { current, target };
    }

    let notification = pick_notification(current, target);
    info!(
        current,
        target,
        channel = notifier.channel_name(),
        title = %notification.title,
        "quota shortfall, sending notification"
    );
    if let Err(e) = notifier.send(&notification).await {
        warn!(error = %e, "failed to deliver KPI notification");
    }

    KpiOutcome::Shortfall { current, target }
}
