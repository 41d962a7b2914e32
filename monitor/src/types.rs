//! Shared data model for the reporting API and the employee list.
//!
//! Wire and storage formats are camelCase JSON, matching what the reporting
//! service and the peripheral UI exchange.

use serde::{Deserialize, Serialize};

/// A tracked employee.
///
/// The employee list lives in the key-value store; only the first entry is
/// ever evaluated for KPI and badge purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Identity used to query the reporting API.
    pub employee_code: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    /// Tool names counted toward the KPI. Empty means the generic
    /// position-based counter applies.
    #[serde(default)]
    pub kpi_tools: Vec<String>,
}

/// Per-day usage counters for one employee, as returned by the reporting API.
///
/// Counters the service omits default to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyUsage {
    /// ISO `YYYY-MM-DD` date string.
    pub date: String,

    /// Generic counter applied when no KPI tools are configured.
    pub position_based_requests: u64,

    pub cline_requests: u64,
    pub cursor_requests: u64,
    pub one_ai_requests: u64,
    pub ai_agent_requests: u64,
}

/// One month of daily usage records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonthlyCalendar {
    pub daily_usage: Vec<DailyUsage>,
}

/// An employee as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub employee_code: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub division_name: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
}

/// Response envelope wrapping every reporting API payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_usage_parses_camel_case_with_missing_counters() {
        let usage: DailyUsage = serde_json::from_str(
            r#"{ "date": "2026-08-29", "clineRequests": 2, "cursorRequests": 3 }"#,
        )
        .expect("parse");

        assert_eq!(usage.date, "2026-08-29");
        assert_eq!(usage.cline_requests, 2);
        assert_eq!(usage.cursor_requests, 3);
        assert_eq!(usage.position_based_requests, 0);
        assert_eq!(usage.one_ai_requests, 0);
    }

    #[test]
    fn envelope_parses_monthly_calendar() {
        let envelope: ApiEnvelope<MonthlyCalendar> = serde_json::from_str(
            r#"{
                "success": true,
                "data": { "dailyUsage": [{ "date": "2026-08-01", "positionBasedRequests": 7 }] }
            }"#,
        )
        .expect("parse");

        assert!(envelope.success);
        let calendar = envelope.data.expect("data");
        assert_eq!(calendar.daily_usage.len(), 1);
        assert_eq!(calendar.daily_usage[0].position_based_requests, 7);
    }

    #[test]
    fn envelope_tolerates_missing_data() {
        let envelope: ApiEnvelope<MonthlyCalendar> =
            serde_json::from_str(r#"{ "success": false, "message": "no such employee" }"#)
                .expect("parse");

        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("no such employee"));
    }

    #[test]
    fn employee_round_trips_camel_case() {
        let employee = Employee {
            employee_code: "E1024".to_string(),
            full_name: Some("Alex Tran".to_string()),
            kpi_tools: vec!["cline".to_string(), "cursor".to_string()],
        };

        let json = serde_json::to_string(&employee).expect("serialize");
        assert!(json.contains("employeeCode"));
        assert!(json.contains("kpiTools"));

        let back: Employee = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, employee);
    }
}
