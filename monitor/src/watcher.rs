//! Storage change notification via filesystem events.
//!
//! The daemon and the CLI are separate processes sharing the same
//! file-backed key-value store, so "settings changed" has to be observed
//! from the filesystem. The watcher maps `<key>.json` modifications to key
//! names and forwards them over a channel, debounced per key so an atomic
//! write-then-rename produces a single event.
//!
//! The notify callback is kept lightweight: it only bridges raw events into
//! an internal channel; key mapping and debouncing happen in a dedicated
//! async task.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{MonitorError, Result};

/// Events within this window collapse into one notification per key.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Watches a storage directory and reports changed keys.
///
/// Kept alive for the duration of the watch; dropping it stops the
/// subscription.
#[derive(Debug)]
pub struct StorageWatcher {
    // Kept alive to maintain the watch subscription.
    #[allow(dead_code)]
    watcher: RecommendedWatcher,
}

impl StorageWatcher {
    /// Starts watching `dir`, sending changed key names on `changed_tx`.
    pub fn new(dir: &Path, changed_tx: mpsc::Sender<String>) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::channel::<PathBuf>(64);

        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| {
                handle_notify_event(result, &raw_tx);
            },
            notify::Config::default(),
        )
        .map_err(|e| MonitorError::Watch(e.to_string()))?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| MonitorError::Watch(e.to_string()))?;

        tokio::spawn(debounce_changes(raw_rx, changed_tx));

        debug!(dir = %dir.display(), "storage watcher started");
        Ok(Self { watcher })
    }
}

/// Lightweight notify callback: forward paths of interest, nothing else.
fn handle_notify_event(
    result: std::result::Result<Event, notify::Error>,
    raw_tx: &mpsc::Sender<PathBuf>,
) {
    let event = match result {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "storage watch error");
            return;
        }
    };

    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }

    for path in event.paths {
        // try_send: never block the notify thread; a full channel only
        // drops redundant change signals.
        if raw_tx.try_send(path).is_err() {
            trace!("raw change channel full, dropping event");
        }
    }
}

/// Maps paths to key names and debounces bursts per key.
async fn debounce_changes(mut raw_rx: mpsc::Receiver<PathBuf>, changed_tx: mpsc::Sender<String>) {
    let mut last_sent: HashMap<String, Instant> = HashMap::new();

    while let Some(path) = raw_rx.recv().await {
        let Some(key) = key_for_path(&path) else {
            continue;
        };

        let now = Instant::now();
        if let Some(previous) = last_sent.get(&key) {
            if now.duration_since(*previous) < DEBOUNCE_WINDOW {
                trace!(key, "debounced storage change");
                continue;
            }
        }
        last_sent.insert(key.clone(), now);

        debug!(key, "storage key changed");
        if changed_tx.send(key).await.is_err() {
            // Receiver gone, the daemon is shutting down.
            return;
        }
    }
}

/// Maps a storage file path to its key name.
///
/// Only `<key>.json` files count; temp files from atomic writes and
/// anything else are ignored.
fn key_for_path(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    Some(path.file_stem()?.to_str()?.to_string())
}
