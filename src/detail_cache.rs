//! Lazily populated per-monitor detail cache with time-based expiry

use crate::errors::Result;
use crate::model::MonitorDetail;
use crate::transport::ApiClient;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct DetailEntry {
    detail: MonitorDetail,
    fetched_at: Instant,
}

/// Cache of monitor details keyed by monitor id.
///
/// Nothing is fetched until a monitor is activated, and activations
/// within the TTL are served from memory. A failed fetch caches
/// nothing, so the next activation retries.
pub struct DetailCache {
    client: ApiClient,
    ttl: Duration,
    entries: RwLock<HashMap<String, DetailEntry>>,
}

impl DetailCache {
    /// Create a new detail cache
    pub fn new(client: ApiClient, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Detail for one monitor, fetched only when absent or expired.
    pub async fn activate(&self, id: &str) -> Result<MonitorDetail> {
        if let Some(detail) = self.fresh(id).await {
            debug!("detail cache hit for {}", id);
            return Ok(detail);
        }

        debug!("detail cache miss for {}, fetching", id);
        let detail = self.client.monitor_detail(id).await?;
        self.set_detail(id, detail.clone()).await;
        Ok(detail)
    }

    /// Drop one entry so the next activation refetches.
    pub async fn invalidate(&self, id: &str) {
        self.entries.write().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn fresh(&self, id: &str) -> Option<MonitorDetail> {
        let entries = self.entries.read().await;
        let entry = entries.get(id)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.detail.clone())
        } else {
            None
        }
    }

    async fn set_detail(&self, id: &str, detail: MonitorDetail) {
        let mut entries = self.entries.write().await;
        entries.insert(
            id.to_string(),
            DetailEntry {
                detail,
                fetched_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::errors::ApiError;
    use crate::identity::{IdentityGate, MemoryIdentityStore};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn make_cache(base_url: &str, ttl: Duration) -> DetailCache {
        let store = Box::new(MemoryIdentityStore::with_identity("alice"));
        let gate = Arc::new(IdentityGate::load(store).await.unwrap());
        let mut config = Config::default();
        config.base_url = base_url.to_string();
        let client = ApiClient::new(&config, gate).unwrap();
        DetailCache::new(client, ttl)
    }

    fn detail_body(id: &str) -> serde_json::Value {
        json!({
            "success": true,
            "message": "ok",
            "statusCode": 200,
            "data": {
                "id": id,
                "interval": "*/1 * * * *",
                "createdAt": "2024-05-01T12:00:00Z",
                "updatedAt": "2024-05-01T12:00:00Z",
                "url": {
                    "id": "url-1",
                    "url": "https://example.com",
                    "status": "UP",
                    "totalUpTime": 3600,
                    "totalDownTime": 60,
                    "totalChecks": 61,
                    "logs": [
                        {
                            "id": "log-1",
                            "status": "UP",
                            "statusCode": 200,
                            "responseTime": 120.0,
                            "checkAt": "2024-05-01T12:00:00Z"
                        }
                    ]
                }
            }
        })
    }

    #[tokio::test]
    async fn second_activation_in_window_is_served_from_memory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron/cron-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("cron-1")))
            .expect(1)
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_secs(300)).await;

        let first = cache.activate("cron-1").await.unwrap();
        let second = cache.activate("cron-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.endpoint.logs.len(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron/cron-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("cron-1")))
            .expect(2)
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_millis(80)).await;

        cache.activate("cron-1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        cache.activate("cron-1").await.unwrap();
    }

    #[tokio::test]
    async fn entries_are_independent_per_monitor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron/cron-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("cron-1")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron/cron-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("cron-2")))
            .expect(1)
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_secs(300)).await;

        cache.activate("cron-1").await.unwrap();
        cache.activate("cron-2").await.unwrap();
        cache.activate("cron-1").await.unwrap();
        cache.activate("cron-2").await.unwrap();
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn failed_fetch_caches_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron/cron-1"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false, "message": "Internal server error", "statusCode": 500
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron/cron-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("cron-1")))
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_secs(300)).await;

        let err = cache.activate("cron-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Server { .. }));
        assert!(cache.is_empty().await);

        // The retry goes back to the service and succeeds.
        let detail = cache.activate("cron-1").await.unwrap();
        assert_eq!(detail.id, "cron-1");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn invalidation_forces_a_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron/cron-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("cron-1")))
            .expect(2)
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_secs(300)).await;

        cache.activate("cron-1").await.unwrap();
        cache.invalidate("cron-1").await;
        cache.activate("cron-1").await.unwrap();
    }
}
