//! Shared monitor-list cache with subscription-driven polling
//!
//! One background task owns every fetch of the list, so overlapping
//! consumers and invalidations never produce concurrent requests. The
//! task runs only while at least one subscription is alive, refreshes
//! on a fixed period, and jumps the schedule when the list is
//! invalidated. A fetch already in flight satisfies any invalidation
//! that arrives while it runs.

use crate::errors::ApiError;
use crate::model::Monitor;
use crate::transport::ApiClient;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Point-in-time view of the monitor list.
///
/// `loading` is true only until the first fetch settles. After a failed
/// refresh the previous `monitors` stay in place and `error` carries
/// what went wrong, so consumers can keep rendering stale data.
#[derive(Clone, Debug)]
pub struct ListSnapshot {
    pub monitors: Vec<Monitor>,
    pub loading: bool,
    pub error: Option<ApiError>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Default for ListSnapshot {
    fn default() -> Self {
        Self {
            monitors: Vec::new(),
            loading: true,
            error: None,
            refreshed_at: None,
        }
    }
}

struct CacheShared {
    client: ApiClient,
    poll_interval: Duration,
    snapshot_tx: watch::Sender<ListSnapshot>,
    invalidate_tx: watch::Sender<u64>,
}

struct PollState {
    subscribers: usize,
    task: Option<JoinHandle<()>>,
}

/// Handle to the shared list cache. Cheap to clone; all clones observe
/// the same snapshot and the same poll task.
#[derive(Clone)]
pub struct MonitorListCache {
    shared: Arc<CacheShared>,
    poll: Arc<Mutex<PollState>>,
}

impl MonitorListCache {
    /// Create a new list cache
    pub fn new(client: ApiClient, poll_interval: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(ListSnapshot::default());
        let (invalidate_tx, _) = watch::channel(0u64);

        Self {
            shared: Arc::new(CacheShared {
                client,
                poll_interval,
                snapshot_tx,
                invalidate_tx,
            }),
            poll: Arc::new(Mutex::new(PollState {
                subscribers: 0,
                task: None,
            })),
        }
    }

    /// Register interest in the list. The first live subscription starts
    /// the poll task; dropping the last one stops it.
    pub fn subscribe(&self) -> ListSubscription {
        let mut poll = self.poll.lock().unwrap();
        poll.subscribers += 1;

        if poll.subscribers == 1 {
            debug!("first subscriber, starting list poll task");
            let shared = Arc::clone(&self.shared);
            let invalidations = self.shared.invalidate_tx.subscribe();
            poll.task = Some(tokio::spawn(poll_loop(shared, invalidations)));
        }

        ListSubscription {
            cache: self.clone(),
        }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> ListSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn watch(&self) -> watch::Receiver<ListSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Mark the cached list stale. If the poll task is idle it refetches
    /// immediately; a fetch already in flight absorbs the request.
    pub fn invalidate(&self) {
        self.shared
            .invalidate_tx
            .send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

impl CacheShared {
    fn apply_success(&self, monitors: Vec<Monitor>) {
        debug!("monitor list refreshed, {} entries", monitors.len());
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.monitors = monitors;
            snapshot.error = None;
            snapshot.loading = false;
            snapshot.refreshed_at = Some(Utc::now());
        });
    }

    fn apply_failure(&self, error: ApiError) {
        warn!("monitor list refresh failed: {}", error);
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.error = Some(error);
            snapshot.loading = false;
        });
    }
}

/// Sole owner of list fetches while subscriptions exist.
async fn poll_loop(shared: Arc<CacheShared>, mut invalidations: watch::Receiver<u64>) {
    loop {
        let result = shared.client.list_monitors().await;

        // Invalidations that arrived while fetching are satisfied by the
        // fetch that just completed.
        invalidations.borrow_and_update();

        match result {
            Ok(monitors) => shared.apply_success(monitors),
            Err(err) => shared.apply_failure(err),
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.poll_interval) => {}
            changed = invalidations.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("list invalidated, refreshing early");
            }
        }
    }
}

/// Keeps the poll task alive while held.
pub struct ListSubscription {
    cache: MonitorListCache,
}

impl ListSubscription {
    pub fn snapshot(&self) -> ListSnapshot {
        self.cache.snapshot()
    }

    pub fn watch(&self) -> watch::Receiver<ListSnapshot> {
        self.cache.watch()
    }
}

impl Drop for ListSubscription {
    fn drop(&mut self) {
        let mut poll = self.cache.poll.lock().unwrap();
        poll.subscribers -= 1;

        if poll.subscribers == 0 {
            if let Some(task) = poll.task.take() {
                debug!("last subscriber gone, stopping list poll task");
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::identity::{IdentityGate, MemoryIdentityStore};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn make_cache(base_url: &str, poll_interval: Duration) -> MonitorListCache {
        let store = Box::new(MemoryIdentityStore::with_identity("alice"));
        let gate = Arc::new(IdentityGate::load(store).await.unwrap());
        let mut config = Config::default();
        config.base_url = base_url.to_string();
        let client = ApiClient::new(&config, gate).unwrap();
        MonitorListCache::new(client, poll_interval)
    }

    fn list_body(urls: &[&str]) -> serde_json::Value {
        let monitors: Vec<serde_json::Value> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                json!({
                    "id": format!("cron-{}", i),
                    "interval": "*/1 * * * *",
                    "createdAt": "2024-05-01T12:00:00Z",
                    "updatedAt": "2024-05-01T12:00:00Z",
                    "url": { "id": format!("url-{}", i), "url": url, "status": "UP" }
                })
            })
            .collect();
        json!({ "success": true, "message": "ok", "statusCode": 200, "data": monitors })
    }

    async fn settled(rx: &mut watch::Receiver<ListSnapshot>) -> ListSnapshot {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if !snapshot.loading {
                return snapshot;
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn starts_loading_then_settles_with_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(list_body(&["https://a.example"])),
            )
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_secs(10)).await;
        assert!(cache.snapshot().loading);
        assert!(cache.snapshot().monitors.is_empty());

        let _sub = cache.subscribe();
        let mut rx = cache.watch();
        let snapshot = settled(&mut rx).await;

        assert_eq!(snapshot.monitors.len(), 1);
        assert!(snapshot.error.is_none());
        assert!(snapshot.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn keeps_stale_data_through_a_failed_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(list_body(&["https://a.example"])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false, "message": "Internal server error", "statusCode": 500
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(list_body(&["https://a.example", "https://b.example"])),
            )
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_millis(150)).await;
        let _sub = cache.subscribe();
        let mut rx = cache.watch();

        let first = settled(&mut rx).await;
        assert_eq!(first.monitors.len(), 1);
        assert!(first.error.is_none());

        rx.changed().await.unwrap();
        let failed = rx.borrow_and_update().clone();
        assert_eq!(failed.monitors.len(), 1, "stale data is retained");
        assert!(matches!(failed.error, Some(ApiError::Server { .. })));

        rx.changed().await.unwrap();
        let recovered = rx.borrow_and_update().clone();
        assert_eq!(recovered.monitors.len(), 2);
        assert!(recovered.error.is_none());
    }

    #[tokio::test]
    async fn invalidation_refreshes_immediately_and_only_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&[])))
            .mount(&server)
            .await;

        // Poll period far beyond the test duration, so every request
        // after the first is invalidation-driven.
        let cache = make_cache(&server.uri(), Duration::from_secs(600)).await;
        let _sub = cache.subscribe();
        let mut rx = cache.watch();
        settled(&mut rx).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 1);

        cache.invalidate();
        rx.changed().await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 2);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            2,
            "a consumed invalidation does not refetch again"
        );
    }

    #[tokio::test]
    async fn subscriptions_share_a_single_poll_task() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&[])))
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_secs(600)).await;
        let first = cache.subscribe();
        let second = cache.subscribe();
        let mut rx = cache.watch();
        settled(&mut rx).await;

        assert_eq!(server.received_requests().await.unwrap().len(), 1);

        // Dropping one of two subscriptions keeps the task alive.
        drop(first);
        cache.invalidate();
        rx.changed().await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 2);

        drop(second);
    }

    #[tokio::test]
    async fn polling_stops_when_the_last_subscription_drops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/cron"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&[])))
            .mount(&server)
            .await;

        let cache = make_cache(&server.uri(), Duration::from_millis(50)).await;
        let sub = cache.subscribe();
        let mut rx = cache.watch();
        settled(&mut rx).await;

        drop(sub);
        let after_drop = server.received_requests().await.unwrap().len();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            after_drop,
            "no fetches continue without subscribers"
        );

        // The snapshot stays readable after the task stops.
        assert!(!cache.snapshot().loading);
    }
}
