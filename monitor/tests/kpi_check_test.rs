//! Integration tests for the end-to-end KPI check.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aimon::kpi::{run_kpi_check, KpiOutcome};
use aimon::notifier::{Notification, Notifier, NotifyError};
use aimon::settings::Settings;
use aimon::stats::StatsClient;
use aimon::storage::{Storage, EMPLOYEE_LIST_KEY};
use aimon::types::Employee;
use aimon::usage::UsageQuery;

/// Notifier fake that records what it was asked to deliver.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().expect("lock").push(notification.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

/// Mounts a calendar response carrying `count` position-based requests for
/// today's local date.
async fn mount_today_usage(server: &MockServer, count: u64) {
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    Mock::given(method("GET"))
        .and(path("/stats/monthly-calendar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "dailyUsage": [{ "date": today, "positionBasedRequests": count }]
            }
        })))
        .mount(server)
        .await;
}

fn seeded_storage(dir: &TempDir) -> Storage {
    let storage = Storage::open(dir.path()).expect("open storage");
    storage
        .set(
            EMPLOYEE_LIST_KEY,
            &vec![Employee {
                employee_code: "E1024".to_string(),
                full_name: Some("Alex Tran".to_string()),
                kpi_tools: Vec::new(),
            }],
        )
        .expect("seed employee list");
    storage
}

fn quota(min_request_count: u32) -> Settings {
    Settings {
        min_request_count,
        ..Settings::default()
    }
}

#[tokio::test]
async fn shortfall_sends_exactly_one_notification_with_counts() {
    let server = MockServer::start().await;
    mount_today_usage(&server, 3).await;

    let dir = TempDir::new().expect("temp dir");
    let storage = seeded_storage(&dir);
    let stats = StatsClient::new(server.uri(), Client::new());
    let usage = UsageQuery::new(&storage, &stats);
    let notifier = RecordingNotifier::default();

    let outcome = run_kpi_check(&quota(5), &usage, &notifier).await;
    assert_eq!(
        outcome,
        KpiOutcome::Shortfall {
            current: 3,
            target: 5
        }
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    // Every catalog message names the current count; no raw placeholders
    // may survive rendering.
    assert!(sent[0].message.contains('3'));
    assert!(!sent[0].message.contains("{{"));
}

#[tokio::test]
async fn met_quota_sends_nothing() {
    let server = MockServer::start().await;
    mount_today_usage(&server, 8).await;

    let dir = TempDir::new().expect("temp dir");
    let storage = seeded_storage(&dir);
    let stats = StatsClient::new(server.uri(), Client::new());
    let usage = UsageQuery::new(&storage, &stats);
    let notifier = RecordingNotifier::default();

    let outcome = run_kpi_check(&quota(5), &usage, &notifier).await;
    assert_eq!(
        outcome,
        KpiOutcome::Met {
            current: 8,
            target: 5
        }
    );
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn exact_quota_counts_as_met() {
    let server = MockServer::start().await;
    mount_today_usage(&server, 5).await;

    let dir = TempDir::new().expect("temp dir");
    let storage = seeded_storage(&dir);
    let stats = StatsClient::new(server.uri(), Client::new());
    let usage = UsageQuery::new(&storage, &stats);
    let notifier = RecordingNotifier::default();

    let outcome = run_kpi_check(&quota(5), &usage, &notifier).await;
    assert_eq!(
        outcome,
        KpiOutcome::Met {
            current: 5,
            target: 5
        }
    );
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn disabled_alerts_skip_the_query_entirely() {
    let server = MockServer::start().await;
    // No usage mock mounted: a remote call would 404 and surface as a
    // shortfall of zero, so the Disabled outcome proves nothing was fetched.
    let dir = TempDir::new().expect("temp dir");
    let storage = seeded_storage(&dir);
    let stats = StatsClient::new(server.uri(), Client::new());
    let usage = UsageQuery::new(&storage, &stats);
    let notifier = RecordingNotifier::default();

    let settings = Settings {
        kpi_alert: false,
        ..Settings::default()
    };
    let outcome = run_kpi_check(&settings, &usage, &notifier).await;
    assert_eq!(outcome, KpiOutcome::Disabled);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn remote_outage_fails_open_to_a_shortfall_alert() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let storage = seeded_storage(&dir);
    let stats = StatsClient::new(server.uri(), Client::new());
    let usage = UsageQuery::new(&storage, &stats);
    let notifier = RecordingNotifier::default();

    let outcome = run_kpi_check(&quota(5), &usage, &notifier).await;
    assert_eq!(
        outcome,
        KpiOutcome::Shortfall {
            current: 0,
            target: 5
        }
    );
    assert_eq!(notifier.sent().len(), 1);
}
