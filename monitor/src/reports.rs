//! Client for the `/reports` endpoints of the reporting API.
//!
//! Aggregate reports are consumed by the CLI only; the daemon never calls
//! them. Report payload shapes vary by deployment, so they are passed
//! through as raw JSON for display.

use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use tracing::debug;

use crate::error::Result;
use crate::stats::unwrap_envelope;
use crate::types::ApiEnvelope;

const BASE_PATH: &str = "/reports";

/// HTTP client for aggregate usage reports.
#[derive(Debug, Clone)]
pub struct ReportsClient {
    api_url: String,
    http: Client,
}

impl ReportsClient {
    /// Creates a reports client over a shared HTTP client.
    #[must_use]
    pub fn new(api_url: impl Into<String>, http: Client) -> Self {
        Self {
            api_url: api_url.into(),
            http,
        }
    }

    /// Fetches the company-wide AI usage report.
    ///
    /// When either bound is omitted the range defaults to the current
    /// calendar month.
    pub async fn overall_usage(
        &self,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<serde_json::Value> {
        let (default_start, default_end) = month_range(chrono::Local::now().date_naive());
        let start = start.unwrap_or(default_start);
        let end = end.unwrap_or(default_end);

        let url = format!(
            "{}{BASE_PATH}/ai-agent/overall",
            self.api_url.trim_end_matches('/')
        );
        debug!(%url, %start, %end, "fetching overall usage report");

        let envelope: ApiEnvelope<serde_json::Value> = self
            .http
            .get(&url)
            .query(&[("startDate", start), ("endDate", end)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        unwrap_envelope(envelope, "overall usage report")
    }
}

/// Returns the first/last-day bounds of `date`'s month, formatted the way
/// the reporting API expects (`YYYY-MM-DDT00:00:00` / `T23:59:59`).
pub fn month_range(date: NaiveDate) -> (String, String) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(first);

    (
        format!("{}T00:00:00", first.format("%Y-%m-%d")),
        format!("{}T23:59:59", last.format("%Y-%m-%d")),
    )
}
