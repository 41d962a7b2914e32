//! Daemon orchestration: wire everything up and dispatch events.
//!
//! The daemon owns the long-lived pieces (storage, HTTP client, alarm
//! service, storage watcher) and runs a single `select!` loop over three
//! inputs: fired alarms, storage change notifications and the shutdown
//! signal. Settings are re-read from storage at every dispatch so a check
//! always sees the current quota and toggles.

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::alarms::TokioAlarms;
use crate::badge::{refresh_badge, FileBadge};
use crate::config::Config;
use crate::kpi::run_kpi_check;
use crate::notifier::{LogNotifier, Notifier, WebhookNotifier};
use crate::schedule::{sync_alarms, AlarmId};
use crate::settings::SettingsStore;
use crate::stats::StatsClient;
use crate::storage::{Storage, SETTINGS_KEY};
use crate::usage::UsageQuery;
use crate::watcher::StorageWatcher;

/// Buffer size for the alarm-fire and storage-change channels.
const CHANNEL_CAPACITY: usize = 64;

/// Runs the monitor daemon until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
    info!(
        api_url = %config.api_url,
        state_dir = %config.state_dir.display(),
        "starting monitor daemon"
    );

    let storage = Storage::open(&config.state_dir).with_context(|| {
        format!(
            "failed to open state directory {}",
            config.state_dir.display()
        )
    })?;

    let http = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;
    let stats = StatsClient::new(config.api_url.clone(), http.clone());

    let notifier: Box<dyn Notifier> = match &config.webhook_url {
        Some(url) => {
            info!(webhook = %url, "KPI notifications go to webhook");
            Box::new(WebhookNotifier::new(url.clone(), http.clone()))
        }
        None => {
            info!("no webhook configured, KPI notifications go to the log");
            Box::new(LogNotifier)
        }
    };

    let badge = FileBadge::new(storage.dir());
    let settings_store = SettingsStore::new(&storage);

    let (fired_tx, mut fired_rx) = mpsc::channel::<AlarmId>(CHANNEL_CAPACITY);
    let alarms = TokioAlarms::new(fired_tx);

    let (changed_tx, mut changed_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let _watcher = StorageWatcher::new(storage.dir(), changed_tx).with_context(|| {
        format!(
            "failed to watch state directory {}",
            storage.dir().display()
        )
    })?;

    let usage = UsageQuery::new(&storage, &stats);

    // Startup: register the alarm set and paint the badge once.
    let settings = settings_store.read();
    sync_alarms(&settings, &alarms, &badge).context("failed to register alarms")?;
    if let Err(e) = refresh_badge(&settings, &usage, &badge).await {
        warn!(error = %e, "initial badge refresh failed");
    }

    info!("monitor running, press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = wait_for_shutdown() => {
                info!("shutdown signal received");
                break;
            }

            Some(alarm) = fired_rx.recv() => {
                handle_alarm(alarm, &settings_store, &usage, notifier.as_ref(), &badge).await;
            }

            Some(key) = changed_rx.recv() => {
                if key == SETTINGS_KEY {
                    info!("settings changed, re-syncing alarms");
                    let settings = settings_store.read();
                    if let Err(e) = sync_alarms(&settings, &alarms, &badge) {
                        warn!(error = %e, "alarm re-sync failed");
                    }
                    if let Err(e) = refresh_badge(&settings, &usage, &badge).await {
                        warn!(error = %e, "badge refresh failed");
                    }
                } else {
                    debug!(key, "ignoring change to non-settings key");
                }
            }
        }
    }

    info!("monitor stopped");
    Ok(())
}

/// Dispatches a single fired alarm.
///
/// Settings are read fresh per fire: a check scheduled under old settings
/// still evaluates against the current quota.
async fn handle_alarm(
    alarm: AlarmId,
    settings_store: &SettingsStore<'_>,
    usage: &UsageQuery<'_>,
    notifier: &dyn Notifier,
    badge: &FileBadge,
) {
    let settings = settings_store.read();
    match alarm {
        AlarmId::KpiCheck { .. } => {
            debug!(%alarm, "running KPI check");
            let outcome = run_kpi_check(&settings, usage, notifier).await;
            debug!(%alarm, ?outcome, "KPI check finished");
        }
        AlarmId::BadgeRefresh => {
            if let Err(e) = refresh_badge(&settings, usage, badge).await {
                warn!(error = %e, "badge refresh failed");
            }
        }
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
