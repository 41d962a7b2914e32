//! Alarm/timer service: named recurring timers.
//!
//! [`AlarmService`] mirrors the host timer interface the scheduler consumes:
//! create replaces any alarm with the same identity, clear cancels it. The
//! production implementation, [`TokioAlarms`], backs each alarm with a
//! spawned task that sleeps until the first fire (or one period, when no
//! first fire is given) and then ticks periodically, reporting fires over an
//! mpsc channel.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::schedule::AlarmId;

/// A request to register (or replace) a recurring alarm.
#[derive(Debug, Clone)]
pub struct AlarmRequest {
    /// Alarm identity; creating twice with the same identity replaces.
    pub id: AlarmId,

    /// Absolute first-fire instant. `None` means the first fire happens
    /// after one period.
    pub first_fire: Option<DateTime<Local>>,

    /// Repeat interval.
    pub period: Duration,
}

/// Host-style recurring timer service.
pub trait AlarmService: Send + Sync {
    /// Registers a recurring alarm, replacing any alarm with the same id.
    fn create(&self, request: AlarmRequest);

    /// Cancels an alarm. Returns `true` if it existed.
    fn clear(&self, id: &AlarmId) -> bool;

    /// Identities of all currently registered alarms.
    fn active(&self) -> Vec<AlarmId>;
}

/// Tokio-task-backed [`AlarmService`].
///
/// Fired alarm ids are delivered over the channel handed to [`new`](Self::new);
/// the daemon loop dispatches on them. Dropping the service aborts all tasks.
#[derive(Debug)]
pub struct TokioAlarms {
    fired_tx: mpsc::Sender<AlarmId>,
    tasks: Mutex<HashMap<AlarmId, JoinHandle<()>>>,
}

impl TokioAlarms {
    /// Creates an alarm service reporting fires on `fired_tx`.
    #[must_use]
    pub fn new(fired_tx: mpsc::Sender<AlarmId>) -> Self {
        Self {
            fired_tx,
            tasks: Mutex::new(HashMap::new()),
        }
    }
}

impl AlarmService for TokioAlarms {
    fn create(&self, request: AlarmRequest) {
        let id = request.id;
        let tx = self.fired_tx.clone();

        let handle = tokio::spawn(async move {
            match request.first_fire {
                Some(first) => {
                    // A first fire at or before now fires immediately.
                    let delay = (first - Local::now()).to_std().unwrap_or(Duration::ZERO);
                    tokio::time::sleep(delay).await;
                }
                None => tokio::time::sleep(request.period).await,
            }

            loop {
                trace!(alarm = %id, "alarm fired");
                if tx.send(id).await.is_err() {
                    // Receiver gone, the daemon is shutting down.
                    return;
                }
                tokio::time::sleep(request.period).await;
            }
        });

        let mut tasks = self.tasks.lock().expect("alarm table lock poisoned");
        if let Some(previous) = tasks.insert(id, handle) {
            previous.abort();
            debug!(alarm = %id, "replaced existing alarm");
        } else {
            debug!(alarm = %id, "registered alarm");
        }
    }

    fn clear(&self, id: &AlarmId) -> bool {
        let mut tasks = self.tasks.lock().expect("alarm table lock poisoned");
        match tasks.remove(id) {
            Some(handle) => {
                handle.abort();
                debug!(alarm = %id, "cleared alarm");
                true
            }
            None => false,
        }
    }

    fn active(&self) -> Vec<AlarmId> {
        let tasks = self.tasks.lock().expect("alarm table lock poisoned");
        tasks.keys().copied().collect()
    }
}

impl Drop for TokioAlarms {
    fn drop(&mut self) {
        let tasks = self.tasks.lock().expect("alarm table lock poisoned");
        for handle in tasks.values() {
            handle.abort();
        }
    }
}
