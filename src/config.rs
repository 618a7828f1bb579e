//! Configuration management for the uptime console

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the uptime monitoring service
    pub base_url: String,

    /// Path of the file holding the persisted identity
    pub identity_path: String,

    /// How often the monitor list is refreshed while watched
    pub poll_interval: Duration,

    /// How long a fetched monitor detail stays fresh
    pub detail_ttl: Duration,

    /// HTTP timeout for service requests
    pub http_timeout: Duration,
}

fn default_identity_path() -> String {
    match env::var("HOME") {
        Ok(home) => format!("{}/.uptime-console/identity", home),
        Err(_) => ".uptime-console-identity".to_string(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            identity_path: default_identity_path(),
            poll_interval: Duration::from_secs(30),
            detail_ttl: Duration::from_secs(300),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(base_url) = env::var("UPTIME_BASE_URL") {
            config.base_url = base_url;
        }

        if let Ok(identity_path) = env::var("UPTIME_IDENTITY_PATH") {
            config.identity_path = identity_path;
        }

        if let Ok(poll_interval) = env::var("UPTIME_POLL_INTERVAL_SECONDS") {
            if let Ok(seconds) = poll_interval.parse::<u64>() {
                config.poll_interval = Duration::from_secs(seconds);
            }
        }

        if let Ok(detail_ttl) = env::var("UPTIME_DETAIL_TTL_SECONDS") {
            if let Ok(seconds) = detail_ttl.parse::<u64>() {
                config.detail_ttl = Duration::from_secs(seconds);
            }
        }

        if let Ok(timeout) = env::var("UPTIME_HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.http_timeout = Duration::from_secs(seconds);
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url cannot be empty".to_string());
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(format!("base_url is not a valid URL: {}", self.base_url));
        }

        if self.identity_path.is_empty() {
            return Err("identity_path cannot be empty".to_string());
        }

        if self.poll_interval.is_zero() {
            return Err("poll_interval must be greater than 0".to_string());
        }

        if self.detail_ttl.is_zero() {
            return Err("detail_ttl must be greater than 0".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("http_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.detail_ttl, Duration::from_secs(300));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.base_url = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poll_interval = Duration::from_secs(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detail_ttl = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }
}
