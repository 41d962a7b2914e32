//! Alarm scheduling: settings in, registered timers out.
//!
//! Two independent tracks. The KPI-check track registers one 24-hour alarm
//! per de-duplicated notification time, replacing the whole set on every
//! sync (full clear-then-recreate, never an incremental diff, which keeps
//! re-scheduling idempotent under racing handlers). The badge-refresh track
//! is a single fixed-interval alarm gated by the quick-view toggle; turning
//! the toggle off also clears the visible badge.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, info};

use crate::alarms::{AlarmRequest, AlarmService};
use crate::badge::BadgeDisplay;
use crate::error::Result;
use crate::settings::{NotificationTime, Settings};

/// Name prefix for KPI-check alarms.
pub const KPI_CHECK_PREFIX: &str = "kpiCheckAlarm_";

/// Name of the badge-refresh alarm.
pub const BADGE_ALARM_NAME: &str = "badgeUpdateAlarm";

/// KPI-check alarms repeat daily.
pub const KPI_CHECK_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Badge refresh interval.
pub const BADGE_REFRESH_PERIOD: Duration = Duration::from_secs(10 * 60);

/// Structured alarm identity.
///
/// The string encoding (`kpiCheckAlarm_HH_MM`, `badgeUpdateAlarm`) exists
/// only at the naming boundary, for logs and interop with the storage the
/// peripheral UI reads. Both fields are zero-padded to two digits so
/// `1:45` and `14:05` can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmId {
    /// Daily KPI check at a fixed wall-clock time.
    KpiCheck { hours: u8, minutes: u8 },
    /// Fixed-interval badge refresh.
    BadgeRefresh,
}

impl AlarmId {
    /// Encodes the identity as its legacy string name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::KpiCheck { hours, minutes } => {
                format!("{KPI_CHECK_PREFIX}{hours:02}_{minutes:02}")
            }
            Self::BadgeRefresh => BADGE_ALARM_NAME.to_string(),
        }
    }

    /// Parses a string name back into a structured identity.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name == BADGE_ALARM_NAME {
            return Some(Self::BadgeRefresh);
        }
        let rest = name.strip_prefix(KPI_CHECK_PREFIX)?;
        let (h, m) = rest.split_once('_')?;
        if h.len() != 2 || m.len() != 2 {
            return None;
        }
        let hours: u8 = h.parse().ok()?;
        let minutes: u8 = m.parse().ok()?;
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(Self::KpiCheck { hours, minutes })
    }

    /// Whether this is a KPI-check alarm.
    #[must_use]
    pub fn is_kpi_check(&self) -> bool {
        matches!(self, Self::KpiCheck { .. })
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// De-duplicates notification times, keeping the first occurrence of each
/// `(hours, minutes)` pair in input order.
#[must_use]
pub fn dedupe_times(times: &[NotificationTime]) -> Vec<NotificationTime> {
    let mut unique: Vec<NotificationTime> = Vec::with_capacity(times.len());
    for time in times {
        if !unique.contains(time) {
            unique.push(*time);
        }
    }
    unique
}

/// Computes the next occurrence of a wall-clock time relative to `now`.
///
/// Today if the instant is not strictly before `now` (an instant exactly
/// equal to `now` fires today), otherwise tomorrow. Out-of-range fields
/// clamp to the last valid wall-clock time.
#[must_use]
pub fn next_occurrence(time: NotificationTime, now: DateTime<Local>) -> DateTime<Local> {
    let hours = u32::from(time.hours).min(23);
    let minutes = u32::from(time.minutes).min(59);

    let naive = now
        .date_naive()
        .and_hms_opt(hours, minutes, 0)
        .unwrap_or_else(|| now.naive_local());

    // A DST gap can make the local time nonexistent; shift an hour forward.
    let candidate = match Local.from_local_datetime(&naive).earliest() {
        Some(dt) => dt,
        None => Local
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
            .unwrap_or(now),
    };

    if candidate < now {
        candidate + chrono::Duration::days(1)
    } else {
        candidate
    }
}

/// Plans the KPI-check alarm set for the given settings.
///
/// Empty when alerts are disabled; otherwise one daily alarm per unique
/// notification time, first firing at its next occurrence.
#[must_use]
pub fn plan_kpi_alarms(settings: &Settings, now: DateTime<Local>) -> Vec<AlarmRequest> {
    if !settings.kpi_alert {
        return Vec::new();
    }

    dedupe_times(&settings.notification_times)
        .into_iter()
        .map(|time| AlarmRequest {
            id: AlarmId::KpiCheck {
                hours: time.hours,
                minutes: time.minutes,
            },
            first_fire: Some(next_occurrence(time, now)),
            period: KPI_CHECK_PERIOD,
        })
        .collect()
}

/// Replaces the registered alarm set to match `settings`.
///
/// Runs on startup and on every settings change. Clearing the quick-view
/// toggle both cancels the refresh alarm and blanks the visible badge in
/// the same operation.
pub fn sync_alarms(
    settings: &Settings,
    alarms: &dyn AlarmService,
    badge: &dyn BadgeDisplay,
) -> Result<()> {
    // Full replace: drop every existing KPI-check alarm first.
    for id in alarms.active() {
        if id.is_kpi_check() {
            alarms.clear(&id);
        }
    }

    let planned = plan_kpi_alarms(settings, Local::now());
    if planned.is_empty() {
        debug!("KPI alerts disabled or no notification times configured");
    }
    for request in planned {
        info!(
            alarm = %request.id,
            first_fire = ?request.first_fire,
            "scheduling KPI check"
        );
        alarms.create(request);
    }

    if settings.quick_view_requests {
        alarms.create(AlarmRequest {
            id: AlarmId::BadgeRefresh,
            first_fire: None,
            period: BADGE_REFRESH_PERIOD,
        });
        debug!("badge refresh alarm registered");
    } else {
        alarms.clear(&AlarmId::BadgeRefresh);
        badge.set_text("")?;
        debug!("badge refresh alarm cleared and badge blanked");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn names_are_zero_padded_and_distinct() {
        let a = AlarmId::KpiCheck {
            hours: 1,
            minutes: 45,
        };
        let b = AlarmId::KpiCheck {
            hours: 14,
            minutes: 5,
        };
        assert_eq!(a.name(), "kpiCheckAlarm_01_45");
        assert_eq!(b.name(), "kpiCheckAlarm_14_05");
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn name_round_trips() {
        let ids = [
            AlarmId::KpiCheck {
                hours: 0,
                minutes: 0,
            },
            AlarmId::KpiCheck {
                hours: 23,
                minutes: 59,
            },
            AlarmId::BadgeRefresh,
        ];
        for id in ids {
            assert_eq!(AlarmId::from_name(&id.name()), Some(id));
        }
    }

    #[test]
    fn from_name_rejects_garbage() {
        assert_eq!(AlarmId::from_name("somethingElse"), None);
        assert_eq!(AlarmId::from_name("kpiCheckAlarm_"), None);
        assert_eq!(AlarmId::from_name("kpiCheckAlarm_1_45"), None);
        assert_eq!(AlarmId::from_name("kpiCheckAlarm_25_00"), None);
        assert_eq!(AlarmId::from_name("kpiCheckAlarm_10_60"), None);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let times = vec![
            NotificationTime::new(10, 30),
            NotificationTime::new(16, 30),
            NotificationTime::new(10, 30),
            NotificationTime::new(9, 0),
            NotificationTime::new(16, 30),
        ];
        assert_eq!(
            dedupe_times(&times),
            vec![
                NotificationTime::new(10, 30),
                NotificationTime::new(16, 30),
                NotificationTime::new(9, 0),
            ]
        );
    }

    #[test]
    fn future_time_fires_today() {
        let now = local(2026, 8, 29, 9, 0, 0);
        let next = next_occurrence(NotificationTime::new(10, 30), now);
        assert_eq!(next, local(2026, 8, 29, 10, 30, 0));
    }

    #[test]
    fn past_time_rolls_to_tomorrow() {
        let now = local(2026, 8, 29, 11, 0, 0);
        let next = next_occurrence(NotificationTime::new(10, 30), now);
        assert_eq!(next, local(2026, 8, 30, 10, 30, 0));
    }

    #[test]
    fn exact_boundary_fires_today() {
        // An instant exactly equal to now is not strictly past.
        let now = local(2026, 8, 29, 10, 30, 0);
        let next = next_occurrence(NotificationTime::new(10, 30), now);
        assert_eq!(next, now);
    }

    #[test]
    fn one_second_past_rolls_to_tomorrow() {
        let now = local(2026, 8, 29, 10, 30, 1);
        let next = next_occurrence(NotificationTime::new(10, 30), now);
        assert_eq!(next, local(2026, 8, 30, 10, 30, 0));
    }

    #[test]
    fn month_boundary_rolls_correctly() {
        let now = local(2026, 8, 31, 23, 0, 0);
        let next = next_occurrence(NotificationTime::new(10, 30), now);
        assert_eq!(next, local(2026, 9, 1, 10, 30, 0));
    }

    #[test]
    fn plan_is_empty_when_alerts_disabled() {
        let settings = Settings {
            kpi_alert: false,
            ..Settings::default()
        };
        assert!(plan_kpi_alarms(&settings, Local::now()).is_empty());
    }

    #[test]
    fn plan_registers_one_alarm_per_unique_time() {
        let settings = Settings {
            notification_times: vec![
                NotificationTime::new(10, 30),
                NotificationTime::new(10, 30),
                NotificationTime::new(16, 30),
            ],
            ..Settings::default()
        };

        let planned = plan_kpi_alarms(&settings, Local::now());
        assert_eq!(planned.len(), 2);
        assert_eq!(
            planned[0].id,
            AlarmId::KpiCheck {
                hours: 10,
                minutes: 30
            }
        );
        assert_eq!(
            planned[1].id,
            AlarmId::KpiCheck {
                hours: 16,
                minutes: 30
            }
        );
        for request in &planned {
            assert_eq!(request.period, KPI_CHECK_PERIOD);
            assert!(request.first_fire.is_some());
        }
    }
}
