//! Wire types for the uptime monitoring service API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Health state reported by the remote scheduler for one endpoint.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointStatus {
    Up,
    Down,
    Pending,
    Error,
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointStatus::Up => write!(f, "UP"),
            EndpointStatus::Down => write!(f, "DOWN"),
            EndpointStatus::Pending => write!(f, "PENDING"),
            EndpointStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl From<&str> for EndpointStatus {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "UP" => EndpointStatus::Up,
            "DOWN" => EndpointStatus::Down,
            "ERROR" => EndpointStatus::Error,
            _ => EndpointStatus::Pending, // Default fallback
        }
    }
}

impl<'de> Deserialize<'de> for EndpointStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(EndpointStatus::from(raw.as_str()))
    }
}

/// The URL under observation plus its aggregated health counters.
///
/// The list endpoint omits `total_checks`; the detail endpoint always
/// includes it. Counter fields are seconds and only ever grow.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub status: Option<EndpointStatus>,
    #[serde(default)]
    pub total_up_time: u64,
    #[serde(default)]
    pub total_down_time: u64,
    #[serde(default)]
    pub total_checks: Option<u64>,
    #[serde(default)]
    pub average_response_time: Option<f64>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_status: Option<EndpointStatus>,
}

/// One historical probe result for an endpoint. Immutable once fetched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckLog {
    pub id: String,
    #[serde(default)]
    pub status: Option<EndpointStatus>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    pub check_at: DateTime<Utc>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A configured recurring check: a cron schedule paired with one endpoint.
///
/// The wire field holding the endpoint is named `url` by the server; the
/// schedule expression is likewise carried in a field named `interval`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: String,
    pub interval: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "url")]
    pub endpoint: Endpoint,
}

/// Endpoint enriched with its recent check history, from the detail fetch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EndpointDetail {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    #[serde(default)]
    pub logs: Vec<CheckLog>,
}

/// Monitor with full endpoint detail, returned only by the per-id fetch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDetail {
    pub id: String,
    pub interval: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "url")]
    pub endpoint: EndpointDetail,
}

/// Body submitted to create a monitor. `interval` carries the translated
/// cron expression, not the raw minute count.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateMonitorRequest {
    pub url: String,
    pub interval: String,
}

/// Response envelope wrapping every payload the service returns.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_code: i64,
    pub data: T,
}
