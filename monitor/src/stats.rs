//! Client for the `/stats` endpoints of the reporting API.
//!
//! Thin reqwest wrappers: transport failures and non-success envelopes
//! surface as typed errors. The fail-open-to-zero policy for usage queries
//! lives one level up, in [`crate::usage`].

use reqwest::Client;
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::types::{ApiEnvelope, EmployeeSummary, MonthlyCalendar};

const BASE_PATH: &str = "/stats";

/// HTTP client for usage statistics.
#[derive(Debug, Clone)]
pub struct StatsClient {
    api_url: String,
    http: Client,
}

impl StatsClient {
    /// Creates a stats client over a shared HTTP client.
    #[must_use]
    pub fn new(api_url: impl Into<String>, http: Client) -> Self {
        Self {
            api_url: api_url.into(),
            http,
        }
    }

    /// Fetches one month of daily usage records for an employee.
    ///
    /// `month` is 1-12; `year` a calendar year.
    pub async fn monthly_calendar(
        &self,
        month: u32,
        year: i32,
        employee_code: &str,
    ) -> Result<MonthlyCalendar> {
        let url = self.endpoint("monthly-calendar");
        debug!(%url, month, year, employee_code, "fetching monthly calendar");

        let envelope: ApiEnvelope<MonthlyCalendar> = self
            .http
            .get(&url)
            .query(&[
                ("month", month.to_string()),
                ("year", year.to_string()),
                ("employeeCode", employee_code.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        unwrap_envelope(envelope, "monthly calendar")
    }

    /// Searches employees by name or code.
    pub async fn search_employees(&self, term: &str) -> Result<Vec<EmployeeSummary>> {
        let url = self.endpoint("employees/search");
        debug!(%url, term, "searching employees");

        let envelope: ApiEnvelope<Vec<EmployeeSummary>> = self
            .http
            .get(&url)
            .query(&[("searchTerm", term)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        unwrap_envelope(envelope, "employee search")
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{BASE_PATH}/{path}", self.api_url.trim_end_matches('/'))
    }
}

/// Reduces an API envelope to its payload, mapping unsuccessful responses
/// to [`MonitorError::Api`].
pub(crate) fn unwrap_envelope<T: Default>(envelope: ApiEnvelope<T>, what: &str) -> Result<T> {
    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| format!("{what} request was not successful"));
        return Err(MonitorError::Api(message));
    }
    Ok(envelope.data.unwrap_or_default())
}
