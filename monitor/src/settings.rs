//! User settings: quota, notification times and feature toggles.
//!
//! Settings live in the key-value store under a single key and are read
//! fresh by every handler. Reads merge the stored record over built-in
//! defaults field by field; writes normalize richer time representations
//! (wall-clock instants from a time picker) down to the canonical
//! `{hours, minutes}` form before anything touches disk.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MonitorError, Result};
use crate::storage::{Storage, SETTINGS_KEY};

/// Default daily request quota.
pub const DEFAULT_MIN_REQUEST_COUNT: u32 = 5;

/// A wall-clock trigger point for KPI notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationTime {
    /// Hour of day, 0-23.
    pub hours: u8,
    /// Minute of hour, 0-59.
    pub minutes: u8,
}

impl NotificationTime {
    /// Creates a new trigger point.
    #[must_use]
    pub const fn new(hours: u8, minutes: u8) -> Self {
        Self { hours, minutes }
    }
}

impl fmt::Display for NotificationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

impl FromStr for NotificationTime {
    type Err = String;

    /// Parses `HH:MM` (e.g. `10:30`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got '{s}'"))?;
        let hours: u8 = h.parse().map_err(|_| format!("invalid hour in '{s}'"))?;
        let minutes: u8 = m.parse().map_err(|_| format!("invalid minute in '{s}'"))?;
        if hours > 23 || minutes > 59 {
            return Err(format!("time out of range: '{s}'"));
        }
        Ok(Self { hours, minutes })
    }
}

/// User-configurable monitor settings.
///
/// Serializes as camelCase JSON, matching the storage format consumed by
/// the peripheral UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Enables periodic badge updates.
    pub quick_view_requests: bool,

    /// Enables quota-shortfall notifications.
    pub kpi_alert: bool,

    /// Daily request quota (the KPI).
    pub min_request_count: u32,

    /// Wall-clock trigger points for KPI checks. Never empty after a read.
    pub notification_times: Vec<NotificationTime>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quick_view_requests: true,
            kpi_alert: true,
            min_request_count: DEFAULT_MIN_REQUEST_COUNT,
            notification_times: vec![NotificationTime::new(10, 30), NotificationTime::new(16, 30)],
        }
    }
}

/// On-disk settings record: every field optional, time entries may be null.
///
/// The stored value wins only when present and non-null; absent fields
/// resolve to defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredSettings {
    quick_view_requests: Option<bool>,
    kpi_alert: Option<bool>,
    min_request_count: Option<u32>,
    notification_times: Option<Vec<Option<NotificationTime>>>,
}

/// A notification time as accepted by [`SettingsStore::write`].
///
/// Time pickers hand over full wall-clock instants; the canonical storage
/// form keeps only hour and minute.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeEntry {
    /// Already in canonical `{hours, minutes}` form.
    Canonical(NotificationTime),
    /// A wall-clock instant; reduced to its hour and minute on write.
    Instant(DateTime<Local>),
}

impl TimeEntry {
    fn canonical(&self) -> NotificationTime {
        match self {
            TimeEntry::Canonical(time) => *time,
            TimeEntry::Instant(dt) => {
                NotificationTime::new(dt.hour() as u8, dt.minute() as u8)
            }
        }
    }
}

impl From<NotificationTime> for TimeEntry {
    fn from(time: NotificationTime) -> Self {
        TimeEntry::Canonical(time)
    }
}

/// A full settings record as handed to [`SettingsStore::write`].
///
/// Unlike [`Settings`], time entries may be absent (`None`) or carry the
/// richer [`TimeEntry`] representation.
#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub quick_view_requests: bool,
    pub kpi_alert: bool,
    pub min_request_count: u32,
    pub notification_times: Vec<Option<TimeEntry>>,
}

impl From<Settings> for SettingsUpdate {
    fn from(settings: Settings) -> Self {
        Self {
            quick_view_requests: settings.quick_view_requests,
            kpi_alert: settings.kpi_alert,
            min_request_count: settings.min_request_count,
            notification_times: settings
                .notification_times
                .into_iter()
                .map(|t| Some(TimeEntry::from(t)))
                .collect(),
        }
    }
}

/// Narrow read/write interface over the settings key.
#[derive(Debug)]
pub struct SettingsStore<'a> {
    storage: &'a Storage,
}

impl<'a> SettingsStore<'a> {
    /// Creates a settings store over the given storage.
    #[must_use]
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Reads settings, merging the stored record over defaults.
    ///
    /// Null time entries are discarded; a list that normalizes to empty
    /// falls back to the built-in default pair. A missing key or an
    /// unreadable record resolves to defaults, never an error the caller
    /// has to handle.
    pub fn read(&self) -> Settings {
        let stored = match self.storage.get::<StoredSettings>(SETTINGS_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => StoredSettings::default(),
            Err(e) => {
                warn!(error = %e, "unreadable settings record, using defaults");
                StoredSettings::default()
            }
        };

        let defaults = Settings::default();
        let mut times: Vec<NotificationTime> = stored
            .notification_times
            .map(|entries| entries.into_iter().flatten().collect())
            .unwrap_or_else(|| defaults.notification_times.clone());
        if times.is_empty() {
            times = defaults.notification_times.clone();
        }

        Settings {
            quick_view_requests: stored
                .quick_view_requests
                .unwrap_or(defaults.quick_view_requests),
            kpi_alert: stored.kpi_alert.unwrap_or(defaults.kpi_alert),
            min_request_count: stored
                .min_request_count
                .unwrap_or(defaults.min_request_count),
            notification_times: times,
        }
    }

    /// Normalizes and persists a full settings record.
    ///
    /// Null entries are dropped and instants reduce to `{hours, minutes}`.
    /// An empty time list is stored as-is; the fallback to defaults happens
    /// on read.
    pub fn write(&self, update: SettingsUpdate) -> Result<()> {
        let times: Vec<NotificationTime> = update
            .notification_times
            .iter()
            .flatten()
            .map(TimeEntry::canonical)
            .collect();

        let record = Settings {
            quick_view_requests: update.quick_view_requests,
            kpi_alert: update.kpi_alert,
            min_request_count: update.min_request_count,
            notification_times: times,
        };

        self.storage
            .set(SETTINGS_KEY, &record)
            .map_err(MonitorError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Storage) {
        let dir = TempDir::new().expect("temp dir");
        let storage = Storage::open(dir.path()).expect("open storage");
        (dir, storage)
    }

    #[test]
    fn missing_key_resolves_to_defaults() {
        let (_dir, storage) = open_temp();
        let settings = SettingsStore::new(&storage).read();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn stored_fields_win_over_defaults() {
        let (_dir, storage) = open_temp();
        storage
            .set(
                SETTINGS_KEY,
                &serde_json::json!({ "minRequestCount": 12, "kpiAlert": false }),
            )
            .expect("seed");

        let settings = SettingsStore::new(&storage).read();
        assert_eq!(settings.min_request_count, 12);
        assert!(!settings.kpi_alert);
        // Untouched fields keep their defaults.
        assert!(settings.quick_view_requests);
        assert_eq!(
            settings.notification_times,
            Settings::default().notification_times
        );
    }

    #[test]
    fn null_time_entries_are_discarded() {
        let (_dir, storage) = open_temp();
        storage
            .set(
                SETTINGS_KEY,
                &serde_json::json!({
                    "notificationTimes": [null, { "hours": 9, "minutes": 0 }, null]
                }),
            )
            .expect("seed");

        let settings = SettingsStore::new(&storage).read();
        assert_eq!(
            settings.notification_times,
            vec![NotificationTime::new(9, 0)]
        );
    }

    #[test]
    fn all_null_times_fall_back_to_default_pair() {
        let (_dir, storage) = open_temp();
        storage
            .set(
                SETTINGS_KEY,
                &serde_json::json!({ "notificationTimes": [null, null] }),
            )
            .expect("seed");

        let settings = SettingsStore::new(&storage).read();
        assert_eq!(
            settings.notification_times,
            Settings::default().notification_times
        );
    }

    #[test]
    fn unreadable_record_degrades_to_defaults() {
        let (dir, storage) = open_temp();
        std::fs::write(dir.path().join("settings.json"), b"{ nope").expect("write");

        let settings = SettingsStore::new(&storage).read();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn write_reduces_instants_to_canonical_form() {
        let (_dir, storage) = open_temp();
        let store = SettingsStore::new(&storage);

        let instant = Local.with_ymd_and_hms(2026, 8, 29, 14, 5, 33).unwrap();
        store
            .write(SettingsUpdate {
                quick_view_requests: true,
                kpi_alert: true,
                min_request_count: 8,
                notification_times: vec![
                    Some(TimeEntry::Instant(instant)),
                    None,
                    Some(TimeEntry::Canonical(NotificationTime::new(16, 30))),
                ],
            })
            .expect("write");

        let settings = store.read();
        assert_eq!(settings.min_request_count, 8);
        assert_eq!(
            settings.notification_times,
            vec![
                NotificationTime::new(14, 5),
                NotificationTime::new(16, 30)
            ]
        );
    }

    #[test]
    fn round_trip_is_canonical() {
        let (_dir, storage) = open_temp();
        let store = SettingsStore::new(&storage);

        let original = Settings {
            quick_view_requests: false,
            kpi_alert: true,
            min_request_count: 7,
            notification_times: vec![NotificationTime::new(8, 15)],
        };
        store.write(original.clone().into()).expect("write");
        assert_eq!(store.read(), original);
    }

    #[test]
    fn stored_json_is_camel_case() {
        let (dir, storage) = open_temp();
        SettingsStore::new(&storage)
            .write(Settings::default().into())
            .expect("write");

        let raw = std::fs::read_to_string(dir.path().join("settings.json")).expect("read");
        assert!(raw.contains("quickViewRequests"));
        assert!(raw.contains("minRequestCount"));
        assert!(raw.contains("notificationTimes"));
    }

    #[test]
    fn parse_notification_time() {
        assert_eq!(
            "10:30".parse::<NotificationTime>().unwrap(),
            NotificationTime::new(10, 30)
        );
        assert_eq!(
            "0:05".parse::<NotificationTime>().unwrap(),
            NotificationTime::new(0, 5)
        );
        assert!("24:00".parse::<NotificationTime>().is_err());
        assert!("10:60".parse::<NotificationTime>().is_err());
        assert!("1030".parse::<NotificationTime>().is_err());
    }

    #[test]
    fn notification_time_displays_zero_padded() {
        assert_eq!(NotificationTime::new(1, 45).to_string(), "01:45");
        assert_eq!(NotificationTime::new(14, 5).to_string(), "14:05");
    }
}
