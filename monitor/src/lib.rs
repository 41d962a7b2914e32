//! Aimon monitor library.
//!
//! Watches a team's AI-tool usage through a central reporting API: a badge
//! file mirrors today's request count, and scheduled KPI checks send a
//! playful nudge whenever the daily quota is not met.
//!
//! # Architecture
//!
//! ```text
//! reporting API <-- stats/reports clients <-- usage query
//!                                               |
//! storage (settings, employee list) --> schedule --> alarms
//!                                               |
//!                                     daemon select! loop
//!                                        /           \
//!                                  kpi + notifier   badge
//! ```
//!
//! The daemon ([`daemon::run`]) owns the long-lived pieces; the CLI in the
//! binary shares the same storage and clients for one-shot commands.

pub mod alarms;
pub mod badge;
pub mod config;
pub mod daemon;
pub mod error;
pub mod kpi;
pub mod notifier;
pub mod reports;
pub mod schedule;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod types;
pub mod usage;
pub mod watcher;

pub use config::Config;
pub use error::{MonitorError, Result};
