//! Monitor create/delete pipeline and the form state it drives
//!
//! Mutations check the identity gate before anything leaves the
//! process, translate the user-facing interval choice into the cron
//! expression the service stores, and invalidate the list cache on
//! success so the next render reflects the change.

use crate::errors::{ApiError, Result};
use crate::identity::IdentityGate;
use crate::list_cache::MonitorListCache;
use crate::model::{CreateMonitorRequest, Monitor};
use crate::transport::ApiClient;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// How often a monitor's endpoint is checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckInterval {
    #[default]
    OneMinute,
    TenMinutes,
    TwentyMinutes,
    ThirtyMinutes,
}

impl CheckInterval {
    pub fn minutes(&self) -> u8 {
        match self {
            CheckInterval::OneMinute => 1,
            CheckInterval::TenMinutes => 10,
            CheckInterval::TwentyMinutes => 20,
            CheckInterval::ThirtyMinutes => 30,
        }
    }

    /// The cron expression the service stores for this choice.
    pub fn cron_expression(&self) -> String {
        format!("*/{} * * * *", self.minutes())
    }
}

impl std::str::FromStr for CheckInterval {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(CheckInterval::OneMinute),
            "10" => Ok(CheckInterval::TenMinutes),
            "20" => Ok(CheckInterval::TwentyMinutes),
            "30" => Ok(CheckInterval::ThirtyMinutes),
            other => Err(ApiError::Validation(format!(
                "check interval '{}' is not supported, expected one of: 1, 10, 20, 30",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CheckInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.minutes())
    }
}

/// Check a monitor URL, returning the trimmed input unchanged on
/// success. The value is submitted as typed, not re-serialized, so the
/// service sees exactly what the user entered.
pub fn validate_monitor_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ApiError::Validation("monitor URL is required".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|_| ApiError::Validation("monitor URL must be a valid URL".to_string()))?;

    if !parsed.has_host() {
        return Err(ApiError::Validation(
            "monitor URL must include a host".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// What a mutation attempt came to.
#[derive(Clone, Debug, PartialEq)]
pub enum MutationOutcome {
    /// The service accepted the mutation.
    Done(Monitor),
    /// No usable identity, locally or per the service. Nothing changed.
    IdentityRequired,
    /// The mutation was refused; the message says why.
    Rejected(String),
}

/// Entry point for every write against the monitoring service.
pub struct MutationPipeline {
    client: ApiClient,
    identity: Arc<IdentityGate>,
    list: MonitorListCache,
}

impl MutationPipeline {
    pub fn new(client: ApiClient, identity: Arc<IdentityGate>, list: MonitorListCache) -> Self {
        Self {
            client,
            identity,
            list,
        }
    }

    /// Create a monitor for `raw_url`, checked every `interval`.
    ///
    /// Fails fast without a request when the gate holds no identity.
    pub async fn create(&self, raw_url: &str, interval: CheckInterval) -> MutationOutcome {
        if !self.identity.has().await {
            return MutationOutcome::IdentityRequired;
        }

        let url = match validate_monitor_url(raw_url) {
            Ok(url) => url,
            Err(err) => return MutationOutcome::Rejected(err.to_string()),
        };

        let request = CreateMonitorRequest {
            url,
            interval: interval.cron_expression(),
        };

        match self.client.create_monitor(&request).await {
            Ok(monitor) => {
                info!("monitor created for {}", monitor.endpoint.url);
                self.list.invalidate();
                MutationOutcome::Done(monitor)
            }
            Err(err) if err.is_auth() => MutationOutcome::IdentityRequired,
            Err(err) => {
                warn!("monitor creation failed: {}", err);
                MutationOutcome::Rejected(err.to_string())
            }
        }
    }

    /// Delete the monitor with the given id.
    pub async fn delete(&self, id: &str) -> MutationOutcome {
        if !self.identity.has().await {
            return MutationOutcome::IdentityRequired;
        }

        let id = id.trim();
        if id.is_empty() {
            return MutationOutcome::Rejected("monitor id is required".to_string());
        }

        match self.client.delete_monitor(id).await {
            Ok(monitor) => {
                info!("monitor {} deleted", monitor.id);
                self.list.invalidate();
                MutationOutcome::Done(monitor)
            }
            Err(err) if err.is_auth() => MutationOutcome::IdentityRequired,
            Err(err) => {
                warn!("monitor deletion failed: {}", err);
                MutationOutcome::Rejected(err.to_string())
            }
        }
    }
}

/// Creation form state, driven through [`CreateForm::submit`].
///
/// A successful submit clears the fields and closes the form. A
/// rejected submit keeps the form open with the typed values intact so
/// the user can correct and retry. An identity requirement closes the
/// form but preserves the input for after the identity is supplied.
#[derive(Debug, Default)]
pub struct CreateForm {
    pub url: String,
    pub interval: CheckInterval,
    pub error: Option<String>,
    pub open: bool,
}

impl CreateForm {
    pub fn open(&mut self) {
        self.open = true;
        self.error = None;
    }

    pub async fn submit(&mut self, pipeline: &MutationPipeline) -> MutationOutcome {
        let outcome = pipeline.create(&self.url, self.interval).await;

        match &outcome {
            MutationOutcome::Done(_) => {
                self.url.clear();
                self.interval = CheckInterval::default();
                self.error = None;
                self.open = false;
            }
            MutationOutcome::IdentityRequired => {
                self.error = None;
                self.open = false;
            }
            MutationOutcome::Rejected(message) => {
                self.error = Some(message.clone());
            }
        }

        outcome
    }
}
