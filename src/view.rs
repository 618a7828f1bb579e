//! Pure presentation helpers derived from fetched monitor state
//!
//! Everything in this module is a total function over already-fetched
//! data. Nothing here touches the network or the caches, which keeps
//! the rendering layer trivially testable.

use crate::errors::ApiError;
use crate::model::{Endpoint, EndpointStatus, Monitor};
use chrono::{DateTime, Utc};

/// Effective status of an endpoint, with unreported treated as pending.
pub fn status_of(endpoint: &Endpoint) -> EndpointStatus {
    endpoint.status.unwrap_or(EndpointStatus::Pending)
}

/// Integer uptime percentage from the accumulated up/down counters.
///
/// Both counters zero means no completed checks yet, reported as 0
/// rather than a division error.
pub fn uptime_percent(up_seconds: u64, down_seconds: u64) -> u8 {
    let total = up_seconds + down_seconds;
    if total == 0 {
        return 0;
    }
    ((up_seconds as f64 / total as f64) * 100.0).round() as u8
}

/// Status predicate used by the list views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Up,
    Down,
    Pending,
    Error,
}

impl std::str::FromStr for StatusFilter {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "up" => Ok(StatusFilter::Up),
            "down" => Ok(StatusFilter::Down),
            "pending" => Ok(StatusFilter::Pending),
            "error" => Ok(StatusFilter::Error),
            other => Err(ApiError::Validation(format!(
                "unknown status filter '{}', expected one of: all, up, down, pending, error",
                other
            ))),
        }
    }
}

/// Monitors whose effective status matches the filter.
pub fn filter_by_status(monitors: &[Monitor], filter: StatusFilter) -> Vec<&Monitor> {
    monitors
        .iter()
        .filter(|monitor| match filter {
            StatusFilter::All => true,
            StatusFilter::Up => status_of(&monitor.endpoint) == EndpointStatus::Up,
            StatusFilter::Down => status_of(&monitor.endpoint) == EndpointStatus::Down,
            StatusFilter::Pending => status_of(&monitor.endpoint) == EndpointStatus::Pending,
            StatusFilter::Error => status_of(&monitor.endpoint) == EndpointStatus::Error,
        })
        .collect()
}

/// Number of monitors currently observed as down.
pub fn down_count(monitors: &[Monitor]) -> usize {
    monitors
        .iter()
        .filter(|monitor| status_of(&monitor.endpoint) == EndpointStatus::Down)
        .count()
}

/// Compact duration like "1d 1h 1m 1s", omitting zero-valued units.
pub fn format_duration(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 {
        parts.push(format!("{}s", seconds));
    }

    if parts.is_empty() {
        return "0s".to_string();
    }
    parts.join(" ")
}

/// Coarse "how long ago" label for timestamps in list rows.
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at).num_seconds().max(0);
    if elapsed < 60 {
        return "just now".to_string();
    }
    let minutes = elapsed / 60;
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

/// Millisecond label for a response time, "N/A" when never measured.
pub fn format_response_time(response_time: Option<f64>) -> String {
    match response_time {
        Some(ms) => format!("{}ms", ms.round() as i64),
        None => "N/A".to_string(),
    }
}
