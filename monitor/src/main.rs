//! Aimon - AI usage monitor.
//!
//! This binary runs the monitor daemon and offers one-shot commands for
//! inspecting usage, managing settings and the tracked-employee list.
//!
//! # Commands
//!
//! - `aimon run`: Start the monitor daemon
//! - `aimon check`: Run a single KPI check now
//! - `aimon badge`: Refresh the badge file once and print its text
//! - `aimon settings`: Show or change monitor settings
//! - `aimon employees`: Search, track and list employees
//! - `aimon report`: Fetch aggregate usage reports
//!
//! # Environment Variables
//!
//! See the [`config`](aimon::config) module for available configuration
//! options.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use aimon::badge::{badge_text, refresh_badge, FileBadge};
use aimon::config::{default_state_dir, Config};
use aimon::kpi::{run_kpi_check, KpiOutcome};
use aimon::notifier::{LogNotifier, Notifier, WebhookNotifier};
use aimon::reports::ReportsClient;
use aimon::settings::{NotificationTime, SettingsStore, SettingsUpdate};
use aimon::stats::StatsClient;
use aimon::storage::{Storage, EMPLOYEE_LIST_KEY};
use aimon::types::Employee;
use aimon::usage::UsageQuery;

/// Aimon - AI usage monitor.
///
/// Watches AI-tool usage through the central reporting API, keeps a badge
/// file with today's request count and nags when the daily KPI quota is
/// not met.
#[derive(Parser, Debug)]
#[command(name = "aimon")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    AIMON_API_URL            Reporting API base URL (required for remote commands)
    AIMON_STATE_DIR          State directory (default: ~/.aimon)
    AIMON_WEBHOOK_URL        Webhook for KPI notifications (default: log only)
    AIMON_HTTP_TIMEOUT_SECS  Reporting API timeout (default: 30)

EXAMPLES:
    # Track yourself, counting only Cline and Cursor requests
    aimon employees track E1024 --name \"Alex Tran\" --tools cline,cursor

    # Raise the daily quota and move the afternoon check
    aimon settings set --quota 8 --times 10:30,15:00

    # Start the monitor
    export AIMON_API_URL=https://reports.internal.example
    aimon run
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the monitor daemon.
    ///
    /// Schedules KPI checks at the configured notification times, refreshes
    /// the badge periodically and reacts to settings changes on disk.
    /// Requires AIMON_API_URL.
    Run,

    /// Run a single KPI check now and report the outcome.
    Check,

    /// Refresh the badge file once and print its text.
    Badge,

    /// Show or change monitor settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Search, track and list employees.
    Employees {
        #[command(subcommand)]
        command: EmployeesCommand,
    },

    /// Fetch aggregate usage reports.
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the effective settings as JSON.
    Show,

    /// Change one or more settings, leaving the rest untouched.
    Set {
        /// Daily request quota (the KPI).
        #[arg(long)]
        quota: Option<u32>,

        /// Enable or disable quota-shortfall notifications.
        #[arg(long)]
        kpi_alert: Option<bool>,

        /// Enable or disable the badge with today's request count.
        #[arg(long)]
        quick_view: Option<bool>,

        /// Notification times as HH:MM, comma separated (e.g. 10:30,16:30).
        #[arg(long, value_delimiter = ',')]
        times: Option<Vec<NotificationTime>>,
    },

    /// Delete the stored settings record, reverting to defaults.
    Reset,
}

#[derive(Subcommand, Debug)]
enum EmployeesCommand {
    /// Search employees by name or code through the reporting API.
    Search {
        /// Name or code fragment to search for.
        term: String,
    },

    /// Track an employee. The first tracked employee is the KPI subject.
    Track {
        /// Employee code as known to the reporting API.
        code: String,

        /// Display name.
        #[arg(long)]
        name: Option<String>,

        /// Tool names counted toward the KPI, comma separated
        /// (cline, cursor, oneai, aiagent). Empty means the generic
        /// position-based counter.
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,
    },

    /// Stop tracking an employee.
    Untrack {
        /// Employee code to remove from the tracked list.
        code: String,
    },

    /// List tracked employees in evaluation order.
    List,
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Company-wide AI usage over a date range (default: current month).
    Overall {
        /// Range start, `YYYY-MM-DDTHH:MM:SS`.
        #[arg(long)]
        start: Option<String>,

        /// Range end, `YYYY-MM-DDTHH:MM:SS`.
        #[arg(long)]
        end: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run => {
            init_logging();
            let config = Config::from_env().context("Failed to load configuration")?;
            block_on(aimon::daemon::run(config))
        }
        Command::Check => block_on(run_check()),
        Command::Badge => block_on(run_badge()),
        Command::Settings { command } => run_settings(command),
        Command::Employees { command } => run_employees(command),
        Command::Report { command } => block_on(run_report(command)),
    }
}

/// Builds a runtime and drives an async command to completion.
fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(future)
}

/// Runs a single KPI check and prints the outcome.
async fn run_check() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let storage = Storage::open(&config.state_dir).context("Failed to open state directory")?;

    let http = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let stats = StatsClient::new(config.api_url.clone(), http.clone());
    let usage = UsageQuery::new(&storage, &stats);

    let notifier: Box<dyn Notifier> = match &config.webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(url.clone(), http)),
        None => Box::new(LogNotifier),
    };

    let settings = SettingsStore::new(&storage).read();
    match run_kpi_check(&settings, &usage, notifier.as_ref()).await {
        KpiOutcome::Disabled => println!("KPI alerts are disabled."),
        KpiOutcome::Met { current, target } => {
            println!("Quota met: {current} of {target} requests today.");
        }
        KpiOutcome::Shortfall { current, target } => {
            println!(
                "Quota not met: {current} of {target} requests today. Notification sent via {}.",
                notifier.channel_name()
            );
        }
    }

    Ok(())
}

/// Refreshes the badge file once and prints its text.
async fn run_badge() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let storage = Storage::open(&config.state_dir).context("Failed to open state directory")?;

    let http = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let stats = StatsClient::new(config.api_url.clone(), http);
    let usage = UsageQuery::new(&storage, &stats);

    let settings = SettingsStore::new(&storage).read();
    let badge = FileBadge::new(storage.dir());
    refresh_badge(&settings, &usage, &badge)
        .await
        .context("Failed to refresh badge")?;

    if settings.quick_view_requests {
        let count = usage.today().await.or_zero();
        println!("{}", badge_text(count));
    } else {
        println!("(badge disabled)");
    }

    Ok(())
}

/// Handles `aimon settings ...`. Local only, no API access needed.
fn run_settings(command: SettingsCommand) -> Result<()> {
    let storage =
        Storage::open(&state_directory()?).context("Failed to open state directory")?;
    let store = SettingsStore::new(&storage);

    match command {
        SettingsCommand::Show => {
            let settings = store.read();
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsCommand::Set {
            quota,
            kpi_alert,
            quick_view,
            times,
        } => {
            let mut settings = store.read();
            if let Some(quota) = quota {
                settings.min_request_count = quota;
            }
            if let Some(kpi_alert) = kpi_alert {
                settings.kpi_alert = kpi_alert;
            }
            if let Some(quick_view) = quick_view {
                settings.quick_view_requests = quick_view;
            }
            if let Some(times) = times {
                settings.notification_times = times;
            }

            store
                .write(SettingsUpdate::from(settings.clone()))
                .context("Failed to write settings")?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsCommand::Reset => {
            use aimon::storage::SETTINGS_KEY;
            let existed = storage
                .remove(SETTINGS_KEY)
                .context("Failed to remove settings record")?;
            if existed {
                println!("Settings reset to defaults.");
            } else {
                println!("No stored settings, defaults already apply.");
            }
        }
    }

    Ok(())
}

/// Handles `aimon employees ...`.
fn run_employees(command: EmployeesCommand) -> Result<()> {
    match command {
        EmployeesCommand::Search { term } => block_on(run_employee_search(term)),
        EmployeesCommand::Track { code, name, tools } => {
            let storage =
                Storage::open(&state_directory()?).context("Failed to open state directory")?;

            let mut employees: Vec<Employee> = storage
                .get(EMPLOYEE_LIST_KEY)
                .context("Failed to read employee list")?
                .unwrap_or_default();

            // Re-tracking an existing code moves it to the front.
            employees.retain(|e| e.employee_code != code);
            employees.insert(
                0,
                Employee {
                    employee_code: code,
                    full_name: name,
                    kpi_tools: tools.unwrap_or_default(),
                },
            );

            storage
                .set(EMPLOYEE_LIST_KEY, &employees)
                .context("Failed to write employee list")?;

            print_employees(&employees);
            Ok(())
        }
        EmployeesCommand::Untrack { code } => {
            let storage =
                Storage::open(&state_directory()?).context("Failed to open state directory")?;
            let mut employees: Vec<Employee> = storage
                .get(EMPLOYEE_LIST_KEY)
                .context("Failed to read employee list")?
                .unwrap_or_default();

            let before = employees.len();
            employees.retain(|e| e.employee_code != code);
            if employees.len() == before {
                println!("'{code}' was not tracked.");
                return Ok(());
            }

            storage
                .set(EMPLOYEE_LIST_KEY, &employees)
                .context("Failed to write employee list")?;
            println!("Stopped tracking '{code}'.");
            Ok(())
        }
        EmployeesCommand::List => {
            let storage =
                Storage::open(&state_directory()?).context("Failed to open state directory")?;
            let employees: Vec<Employee> = storage
                .get(EMPLOYEE_LIST_KEY)
                .context("Failed to read employee list")?
                .unwrap_or_default();

            if employees.is_empty() {
                println!("No tracked employees.");
            } else {
                print_employees(&employees);
            }
            Ok(())
        }
    }
}

/// Searches employees through the reporting API and prints the hits.
async fn run_employee_search(term: String) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let http = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let stats = StatsClient::new(config.api_url.clone(), http);

    let hits = stats
        .search_employees(&term)
        .await
        .context("Employee search failed")?;

    if hits.is_empty() {
        println!("No employees match '{term}'.");
        return Ok(());
    }

    for hit in hits {
        let name = hit.full_name.as_deref().unwrap_or("-");
        let division = hit.division_name.as_deref().unwrap_or("-");
        println!("{:<12} {:<30} {}", hit.employee_code, name, division);
    }

    Ok(())
}

/// Handles `aimon report ...`.
async fn run_report(command: ReportCommand) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let http = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let reports = ReportsClient::new(config.api_url.clone(), http);

    match command {
        ReportCommand::Overall { start, end } => {
            let report = reports
                .overall_usage(start, end)
                .await
                .context("Failed to fetch overall usage report")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Prints tracked employees, one per line, subject first.
fn print_employees(employees: &[Employee]) {
    for (index, employee) in employees.iter().enumerate() {
        let marker = if index == 0 { "*" } else { " " };
        let name = employee.full_name.as_deref().unwrap_or("-");
        let tools = if employee.kpi_tools.is_empty() {
            "(position-based)".to_string()
        } else {
            employee.kpi_tools.join(",")
        };
        println!("{marker} {:<12} {:<30} {tools}", employee.employee_code, name);
    }
}

/// Resolves the state directory for local-only commands.
///
/// Honors AIMON_STATE_DIR without requiring the rest of the daemon
/// configuration.
fn state_directory() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("AIMON_STATE_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    default_state_dir().context("Failed to determine home directory")
}

/// Initializes the logging subsystem.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}
