//! HTTP transport layer for talking to the uptime monitoring service

use crate::config::Config;
use crate::errors::{ApiError, Result};
use crate::identity::IdentityGate;
use crate::model::{CreateMonitorRequest, Envelope, Monitor, MonitorDetail};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Request header carrying the caller identity.
pub const IDENTITY_HEADER: &str = "x-username";

/// Typed client for the monitoring service REST API.
///
/// Every response arrives wrapped in the service envelope; callers get
/// the unwrapped payload or a classified [`ApiError`]. The identity
/// header is attached automatically whenever the gate holds one.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    identity: Arc<IdentityGate>,
}

/// Lenient view of an error body, enough to lift the server's message.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &Config, identity: Arc<IdentityGate>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(format!("uptime_console/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ApiError::Config(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            identity,
        })
    }

    /// Fetch every configured monitor.
    pub async fn list_monitors(&self) -> Result<Vec<Monitor>> {
        self.request(Method::GET, "/api/v1/cron", None).await
    }

    /// Fetch one monitor with its recent check history.
    pub async fn monitor_detail(&self, id: &str) -> Result<MonitorDetail> {
        self.request(Method::GET, &format!("/api/v1/cron/{}", id), None)
            .await
    }

    /// Register a new monitor.
    pub async fn create_monitor(&self, request: &CreateMonitorRequest) -> Result<Monitor> {
        let body = serde_json::to_value(request)?;
        self.request(Method::POST, "/api/v1/cron", Some(body)).await
    }

    /// Remove a monitor, returning the record the service deleted.
    pub async fn delete_monitor(&self, id: &str) -> Result<Monitor> {
        self.request(Method::DELETE, &format!("/api/v1/cron/{}", id), None)
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);

        if let Some(identity) = self.identity.get().await {
            request = request.header(IDENTITY_HEADER, identity);
        }

        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
            return Ok(envelope.data);
        }

        Err(classify_failure(status.as_u16(), &bytes))
    }
}

/// Map a non-success response to the error the caller should see.
fn classify_failure(status: u16, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| format!("request failed with status {}", status));

    match status {
        401 | 403 => ApiError::AuthRequired,
        404 => ApiError::NotFound(message),
        _ => ApiError::Server { status, message },
    }
}
