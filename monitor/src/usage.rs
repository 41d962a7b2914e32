//! Usage query: today's request count for the tracked employee.
//!
//! The subject is always the first entry of the stored employee list; an
//! empty list is a valid "nothing to check" state that short-circuits to
//! zero without a remote call. Remote failure maps to
//! [`UsageQueryResult::Unavailable`] so the fail-open policy stays visible
//! at the call sites instead of hiding in a catch block.

use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, warn};

use crate::stats::StatsClient;
use crate::storage::{Storage, EMPLOYEE_LIST_KEY};
use crate::types::{DailyUsage, Employee};

/// AI tools whose counters can be summed toward the KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiTool {
    Cline,
    Cursor,
    OneAi,
    AiAgent,
}

impl KpiTool {
    /// Maps a configured tool name to its counter. Unrecognized names
    /// resolve to `None` and are ignored silently.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cline" => Some(Self::Cline),
            "cursor" => Some(Self::Cursor),
            "oneai" => Some(Self::OneAi),
            "aiagent" => Some(Self::AiAgent),
            _ => None,
        }
    }

    fn counter(self, daily: &DailyUsage) -> u64 {
        match self {
            Self::Cline => daily.cline_requests,
            Self::Cursor => daily.cursor_requests,
            Self::OneAi => daily.one_ai_requests,
            Self::AiAgent => daily.ai_agent_requests,
        }
    }
}

/// Reduces one day's usage record to a single KPI count.
///
/// With no configured tools the generic position-based counter applies;
/// otherwise only the counters of recognized tool names are summed.
#[must_use]
pub fn calculate_kpi_requests(daily: &DailyUsage, kpi_tools: &[String]) -> u64 {
    if kpi_tools.is_empty() {
        return daily.position_based_requests;
    }

    kpi_tools
        .iter()
        .filter_map(|name| KpiTool::from_name(name))
        .map(|tool| tool.counter(daily))
        .sum()
}

/// Outcome of a usage query.
///
/// `Unavailable` means the remote service could not answer; callers
/// collapse it to zero via [`or_zero`](Self::or_zero), which makes a remote
/// outage surface as a quota shortfall rather than silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageQueryResult {
    /// The count was determined (possibly zero).
    Available(u64),
    /// The remote service failed; no count is known.
    Unavailable,
}

impl UsageQueryResult {
    /// Collapses `Unavailable` to zero: the fail-open policy.
    #[must_use]
    pub fn or_zero(self) -> u64 {
        match self {
            Self::Available(count) => count,
            Self::Unavailable => 0,
        }
    }
}

/// Fetches and reduces daily usage for the tracked employee.
#[derive(Debug)]
pub struct UsageQuery<'a> {
    storage: &'a Storage,
    stats: &'a StatsClient,
}

impl<'a> UsageQuery<'a> {
    /// Creates a usage query over the given storage and stats client.
    #[must_use]
    pub fn new(storage: &'a Storage, stats: &'a StatsClient) -> Self {
        Self { storage, stats }
    }

    /// Today's KPI request count (local calendar day).
    pub async fn today(&self) -> UsageQueryResult {
        self.for_date(Local::now().date_naive()).await
    }

    /// KPI request count for an arbitrary date.
    pub async fn for_date(&self, date: NaiveDate) -> UsageQueryResult {
        let employees: Vec<Employee> = match self.storage.get(EMPLOYEE_LIST_KEY) {
            Ok(Some(list)) => list,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "unreadable employee list");
                return UsageQueryResult::Unavailable;
            }
        };

        // Only the first employee is ever evaluated.
        let Some(subject) = employees.first() else {
            debug!("no tracked employees, skipping usage query");
            return UsageQueryResult::Available(0);
        };

        let calendar = match self
            .stats
            .monthly_calendar(date.month(), date.year(), &subject.employee_code)
            .await
        {
            Ok(calendar) => calendar,
            Err(e) => {
                warn!(
                    error = %e,
                    employee_code = %subject.employee_code,
                    "usage query failed"
                );
                return UsageQueryResult::Unavailable;
            }
        };

        let iso_date = date.format("%Y-%m-%d").to_string();
        let count = calendar
            .daily_usage
            .iter()
            .find(|usage| usage.date == iso_date)
            .map(|usage| calculate_kpi_requests(usage, &subject.kpi_tools))
            .unwrap_or(0);

        UsageQueryResult::Available(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(position: u64, cline: u64, cursor: u64, oneai: u64, aiagent: u64) -> DailyUsage {
        DailyUsage {
            date: "2026-08-29".to_string(),
            position_based_requests: position,
            cline_requests: cline,
            cursor_requests: cursor,
            one_ai_requests: oneai,
            ai_agent_requests: aiagent,
        }
    }

    #[test]
    fn empty_tool_filter_uses_position_based_counter() {
        let usage = daily(7, 2, 3, 10, 1);
        assert_eq!(calculate_kpi_requests(&usage, &[]), 7);
    }

    #[test]
    fn tool_filter_sums_only_selected_counters() {
        let usage = daily(0, 2, 3, 10, 0);
        let tools = vec!["cline".to_string(), "cursor".to_string()];
        assert_eq!(calculate_kpi_requests(&usage, &tools), 5);
    }

    #[test]
    fn unrecognized_tools_are_ignored_silently() {
        let usage = daily(0, 2, 0, 0, 4);
        let tools = vec![
            "cline".to_string(),
            "copilot".to_string(),
            "aiagent".to_string(),
        ];
        assert_eq!(calculate_kpi_requests(&usage, &tools), 6);
    }

    #[test]
    fn only_unrecognized_tools_sum_to_zero() {
        let usage = daily(9, 2, 3, 4, 5);
        let tools = vec!["copilot".to_string()];
        assert_eq!(calculate_kpi_requests(&usage, &tools), 0);
    }

    #[test]
    fn kpi_tool_names() {
        assert_eq!(KpiTool::from_name("cline"), Some(KpiTool::Cline));
        assert_eq!(KpiTool::from_name("cursor"), Some(KpiTool::Cursor));
        assert_eq!(KpiTool::from_name("oneai"), Some(KpiTool::OneAi));
        assert_eq!(KpiTool::from_name("aiagent"), Some(KpiTool::AiAgent));
        assert_eq!(KpiTool::from_name("Cline"), None);
        assert_eq!(KpiTool::from_name(""), None);
    }

    #[test]
    fn or_zero_collapses_unavailable() {
        assert_eq!(UsageQueryResult::Available(3).or_zero(), 3);
        assert_eq!(UsageQueryResult::Unavailable.or_zero(), 0);
    }
}
