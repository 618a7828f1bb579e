//! Terminal front end wiring the caches and pipeline to subcommands

use crate::detail_cache::DetailCache;
use crate::errors::ApiError;
use crate::identity::IdentityGate;
use crate::list_cache::MonitorListCache;
use crate::model::{EndpointStatus, Monitor, MonitorDetail};
use crate::mutations::{CheckInterval, CreateForm, MutationOutcome, MutationPipeline};
use crate::view::{
    down_count, filter_by_status, format_duration, format_relative, format_response_time,
    status_of, uptime_percent, StatusFilter,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "uptime-console", version, about = "Console for the URL uptime monitoring service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and print the monitor list once
    List {
        /// Show only monitors with this status (all, up, down, pending, error)
        #[arg(long, default_value = "all")]
        filter: String,
    },
    /// Keep polling the monitor list and reprint it on every refresh
    Watch {
        /// Show only monitors with this status (all, up, down, pending, error)
        #[arg(long, default_value = "all")]
        filter: String,
    },
    /// Show one monitor with its recent check history
    Show {
        /// Monitor id
        id: String,
    },
    /// Create a new monitor
    Create {
        /// URL to observe
        #[arg(long)]
        url: String,
        /// Check interval in minutes (1, 10, 20 or 30)
        #[arg(long, default_value = "1")]
        interval: String,
    },
    /// Delete a monitor
    Delete {
        /// Monitor id
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Manage the identity sent with mutations
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum IdentityAction {
    /// Validate, persist, and activate an identity
    Set { name: String },
    /// Forget the stored identity
    Clear,
    /// Print the active identity
    Show,
}

/// Owns the long-lived pieces and executes one subcommand.
///
/// Exit codes: 0 on success, 1 on failure, 2 when an identity is
/// required before the command can do anything.
pub struct Console {
    identity: Arc<IdentityGate>,
    list: MonitorListCache,
    details: DetailCache,
    pipeline: MutationPipeline,
}

impl Console {
    pub fn new(
        identity: Arc<IdentityGate>,
        list: MonitorListCache,
        details: DetailCache,
        pipeline: MutationPipeline,
    ) -> Self {
        Self {
            identity,
            list,
            details,
            pipeline,
        }
    }

    pub async fn run(&self, command: Command) -> i32 {
        match command {
            Command::List { filter } => self.run_list(&filter).await,
            Command::Watch { filter } => self.run_watch(&filter).await,
            Command::Show { id } => self.run_show(&id).await,
            Command::Create { url, interval } => self.run_create(&url, &interval).await,
            Command::Delete { id, yes } => self.run_delete(&id, yes).await,
            Command::Identity { action } => self.run_identity(action).await,
        }
    }

    async fn run_list(&self, filter: &str) -> i32 {
        let filter = match filter.parse::<StatusFilter>() {
            Ok(filter) => filter,
            Err(err) => {
                eprintln!("{}", err);
                return 1;
            }
        };

        let subscription = self.list.subscribe();
        let mut rx = subscription.watch();
        while rx.borrow_and_update().loading {
            if rx.changed().await.is_err() {
                break;
            }
        }
        let snapshot = subscription.snapshot();

        if let Some(err) = &snapshot.error {
            if snapshot.monitors.is_empty() {
                eprintln!("Failed to load monitors: {}", err);
                return 1;
            }
            eprintln!("Warning: last refresh failed, showing stale data: {}", err);
        }

        render_list(&snapshot.monitors, filter);
        0
    }

    async fn run_watch(&self, filter: &str) -> i32 {
        let filter = match filter.parse::<StatusFilter>() {
            Ok(filter) => filter,
            Err(err) => {
                eprintln!("{}", err);
                return 1;
            }
        };

        let subscription = self.list.subscribe();
        let mut rx = subscription.watch();
        println!("Watching monitors, Ctrl-C to stop.");

        loop {
            let snapshot = rx.borrow_and_update().clone();
            if !snapshot.loading {
                if let Some(err) = &snapshot.error {
                    eprintln!("Refresh failed, data may be stale: {}", err);
                }
                println!();
                if let Some(at) = snapshot.refreshed_at {
                    println!("Refreshed {}", at.format("%H:%M:%S"));
                }
                render_list(&snapshot.monitors, filter);
            }

            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return 0;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    return 0;
                }
            }
        }
    }

    async fn run_show(&self, id: &str) -> i32 {
        match self.details.activate(id).await {
            Ok(detail) => {
                render_detail(&detail);
                0
            }
            Err(ApiError::NotFound(message)) => {
                eprintln!("{}", message);
                1
            }
            Err(err) => {
                eprintln!("Failed to load monitor {}: {}", id, err);
                1
            }
        }
    }

    async fn run_create(&self, url: &str, interval: &str) -> i32 {
        let interval = match interval.parse::<CheckInterval>() {
            Ok(interval) => interval,
            Err(err) => {
                eprintln!("{}", err);
                return 1;
            }
        };

        let mut form = CreateForm::default();
        form.open();
        form.url = url.to_string();
        form.interval = interval;

        match form.submit(&self.pipeline).await {
            MutationOutcome::Done(monitor) => {
                println!(
                    "Monitor {} created, checking {} every {}m.",
                    monitor.id, monitor.endpoint.url, interval
                );
                0
            }
            MutationOutcome::IdentityRequired => {
                eprintln!("An identity is required. Set one with: uptime-console identity set <name>");
                2
            }
            MutationOutcome::Rejected(message) => {
                eprintln!("{}", message);
                1
            }
        }
    }

    async fn run_delete(&self, id: &str, yes: bool) -> i32 {
        if !yes && !confirm_delete(id) {
            println!("Aborted.");
            return 0;
        }

        match self.pipeline.delete(id).await {
            MutationOutcome::Done(monitor) => {
                self.details.invalidate(&monitor.id).await;
                println!("Monitor {} deleted.", monitor.id);
                0
            }
            MutationOutcome::IdentityRequired => {
                eprintln!("An identity is required. Set one with: uptime-console identity set <name>");
                2
            }
            MutationOutcome::Rejected(message) => {
                eprintln!("{}", message);
                1
            }
        }
    }

    async fn run_identity(&self, action: IdentityAction) -> i32 {
        match action {
            IdentityAction::Set { name } => match self.identity.set(&name).await {
                Ok(stored) => {
                    println!("Identity set to {}.", stored);
                    0
                }
                Err(err) => {
                    eprintln!("{}", err);
                    1
                }
            },
            IdentityAction::Clear => match self.identity.clear().await {
                Ok(()) => {
                    println!("Identity cleared.");
                    0
                }
                Err(err) => {
                    eprintln!("{}", err);
                    1
                }
            },
            IdentityAction::Show => {
                match self.identity.get().await {
                    Some(identity) => println!("{}", identity),
                    None => println!("No identity set."),
                }
                0
            }
        }
    }
}

fn render_list(monitors: &[Monitor], filter: StatusFilter) {
    let rows = filter_by_status(monitors, filter);

    if rows.is_empty() {
        println!("No monitors found.");
        return;
    }

    let now = Utc::now();
    println!(
        "{:<12} {:<8} {:<40} {:<14} {:>7}  {}",
        "ID", "STATUS", "URL", "SCHEDULE", "UPTIME", "LAST CHECK"
    );
    for monitor in &rows {
        let endpoint = &monitor.endpoint;
        let uptime = uptime_percent(endpoint.total_up_time, endpoint.total_down_time);
        let last_check = endpoint
            .last_checked_at
            .map(|at| format_relative(at, now))
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<12} {:<8} {:<40} {:<14} {:>6}%  {}",
            monitor.id,
            status_of(endpoint),
            endpoint.url,
            monitor.interval,
            uptime,
            last_check
        );
    }

    println!();
    println!("{} monitored, {} down", monitors.len(), down_count(monitors));
}

fn render_detail(detail: &MonitorDetail) {
    let endpoint = &detail.endpoint.endpoint;
    let now = Utc::now();

    println!("{}", endpoint.url);
    println!("  id:            {}", detail.id);
    println!("  status:        {}", status_of(endpoint));
    println!("  schedule:      {}", detail.interval);
    println!(
        "  uptime:        {}%",
        uptime_percent(endpoint.total_up_time, endpoint.total_down_time)
    );
    println!("  time up:       {}", format_duration(endpoint.total_up_time));
    println!("  time down:     {}", format_duration(endpoint.total_down_time));
    if let Some(checks) = endpoint.total_checks {
        println!("  checks:        {}", checks);
    }
    println!(
        "  avg response:  {}",
        format_response_time(endpoint.average_response_time)
    );
    match endpoint.last_checked_at {
        Some(at) => println!("  last checked:  {}", format_relative(at, now)),
        None => println!("  last checked:  never"),
    }

    if detail.endpoint.logs.is_empty() {
        println!();
        println!("No checks recorded yet.");
        return;
    }

    println!();
    println!("Recent checks:");
    println!(
        "  {:<20} {:<8} {:>5} {:>9}  {}",
        "WHEN", "STATUS", "CODE", "RESPONSE", "ERROR"
    );
    for log in &detail.endpoint.logs {
        let status = log.status.unwrap_or(EndpointStatus::Pending);
        let code = log
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:<8} {:>5} {:>9}  {}",
            log.check_at.format("%Y-%m-%d %H:%M:%S"),
            status,
            code,
            format_response_time(log.response_time),
            log.error_message.as_deref().unwrap_or("")
        );
    }
}

fn confirm_delete(id: &str) -> bool {
    print!("Delete monitor {}? [y/N] ", id);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
