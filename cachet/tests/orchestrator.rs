use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use cachet::{
    Cache, CacheBuilder, CachePlan, CacheStatus, CacheStore, Lookup, LruStore, PolicyConfig,
    RefreshConfig, TimeoutPolicy, Upstream, upstream_fn,
};
use cachet_core::{CachedResponse, Fingerprint, IgnoreParams, RequestParts, Strategy};
use chrono::{DateTime, Utc};
use http::{Method, StatusCode, Uri};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<CachedResponse, io::Error>> + Send>>;

/// Test handler that counts its calls.
struct Handler {
    calls: Arc<AtomicUsize>,
    gate: Option<Arc<Notify>>,
    body: Option<&'static str>,
}

impl Upstream<()> for Handler {
    type Response = CachedResponse;
    type Error = io::Error;
    type Future = HandlerFuture;

    fn call(&mut self, _request: ()) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.clone();
        let body = self.body;
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            match body {
                Some(body) => Ok(CachedResponse::json(body)),
                None => Err(io::Error::other("database unavailable")),
            }
        })
    }
}

/// Handler that answers with `body`.
fn counting(calls: &Arc<AtomicUsize>, body: &'static str) -> Handler {
    Handler {
        calls: Arc::clone(calls),
        gate: None,
        body: Some(body),
    }
}

/// Handler that only answers once `gate` is notified.
fn gated(calls: &Arc<AtomicUsize>, gate: &Arc<Notify>, body: &'static str) -> Handler {
    Handler {
        calls: Arc::clone(calls),
        gate: Some(Arc::clone(gate)),
        body: Some(body),
    }
}

/// Handler that always fails.
fn failing(calls: &Arc<AtomicUsize>) -> Handler {
    Handler {
        calls: Arc::clone(calls),
        gate: None,
        body: None,
    }
}

/// Store whose next lookup can be made to return an earlier read.
#[derive(Default)]
struct LaggingStore {
    inner: LruStore,
    replay: Mutex<Option<Lookup>>,
}

impl CacheStore for LaggingStore {
    fn get(&self, key: &Fingerprint) -> Lookup {
        match self.replay.lock().unwrap().take() {
            Some(lookup) => lookup,
            None => self.inner.get(key),
        }
    }

    fn put_at(&self, key: Fingerprint, response: &CachedResponse, stored_at: DateTime<Utc>) {
        self.inner.put_at(key, response, stored_at);
    }

    fn remove(&self, key: &Fingerprint) -> bool {
        self.inner.remove(key)
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

fn get(uri: &'static str) -> RequestParts {
    RequestParts::new(Method::GET, &Uri::from_static(uri))
}

/// Stores `body` for `parts` as if it had been written `age` ago.
fn seed(cache: &Cache, parts: &RequestParts, body: &'static str, age: chrono::Duration) {
    let CachePlan::Lookup(fingerprint) = cache.plan(parts) else {
        panic!("request should be cacheable");
    };
    cache
        .store()
        .put_at(fingerprint, &CachedResponse::json(body), Utc::now() - age);
}

#[tokio::test]
async fn miss_populates_then_hits() {
    let cache = Cache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let parts = get("/api/posts?page=2&tag=go&sign=abc123&nonce=xyz");

    let (response, status) = cache.call(&parts, (), counting(&calls, "[1]")).await;
    assert_eq!(status, CacheStatus::Miss);
    assert_eq!(response.unwrap().body, Bytes::from_static(b"[1]"));

    // Same request with reordered parameters and different signature values.
    let reordered = get("/api/posts?tag=go&page=2&nonce=999&sign=def456");
    let (response, status) = cache.call(&reordered, (), counting(&calls, "[2]")).await;
    assert_eq!(status, CacheStatus::Hit);
    assert_eq!(response.unwrap().body, Bytes::from_static(b"[1]"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.store().len(), 1);
}

#[tokio::test]
async fn fresh_entry_never_calls_handler() {
    let cache = Cache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let parts = get("/api/feed");
    seed(&cache, &parts, "cached", chrono::Duration::seconds(30));

    let (response, status) = cache.call(&parts, (), counting(&calls, "fresh")).await;

    assert_eq!(status, CacheStatus::Hit);
    let response = response.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.unwrap(), "application/json");
    assert_eq!(response.body, Bytes::from_static(b"cached"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(cache.tokens().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stale_hits_refresh_exactly_once() {
    let cache = Cache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let parts = get("/api/hot?id=7");
    seed(&cache, &parts, "old", chrono::Duration::minutes(2));

    let requests: Vec<_> = (0..32)
        .map(|_| {
            let cache = cache.clone();
            let parts = parts.clone();
            let handler = gated(&calls, &gate, "new");
            tokio::spawn(async move { cache.call(&parts, (), handler).await })
        })
        .collect();

    for request in requests {
        let (response, status) = request.await.unwrap();
        assert_eq!(status, CacheStatus::Stale);
        assert_eq!(response.unwrap().body, Bytes::from_static(b"old"));
    }

    gate.notify_one();
    cache.pool().wait_all().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.tokens().is_empty());

    let (response, status) = cache.call(&parts, (), counting(&calls, "unused")).await;
    assert_eq!(status, CacheStatus::Hit);
    assert_eq!(response.unwrap().body, Bytes::from_static(b"new"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_skipped_when_entry_was_refreshed_after_lookup() {
    let cache = CacheBuilder::new(LaggingStore::default()).build();
    let calls = Arc::new(AtomicUsize::new(0));
    let parts = get("/api/hot?id=9");
    let CachePlan::Lookup(fingerprint) = cache.plan(&parts) else {
        panic!("request should be cacheable");
    };
    cache.store().put_at(
        fingerprint.clone(),
        &CachedResponse::json("old"),
        Utc::now() - chrono::Duration::minutes(2),
    );
    // Read before the refresh below lands.
    let outdated = cache.store().inner.get(&fingerprint);

    let (_, status) = cache.call(&parts, (), counting(&calls, "new")).await;
    assert_eq!(status, CacheStatus::Stale);
    cache.pool().wait_all().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // This request saw the stale entry, but reaches the token after the refresh finished.
    *cache.store().replay.lock().unwrap() = Some(outdated);
    let (response, status) = cache.call(&parts, (), counting(&calls, "newer")).await;
    assert_eq!(status, CacheStatus::Stale);
    assert_eq!(response.unwrap().body, Bytes::from_static(b"old"));
    cache.pool().wait_all().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.tokens().is_empty());

    let (response, status) = cache.call(&parts, (), counting(&calls, "unused")).await;
    assert_eq!(status, CacheStatus::Hit);
    assert_eq!(response.unwrap().body, Bytes::from_static(b"new"));
}

#[tokio::test]
async fn non_get_requests_bypass() {
    let cache = Cache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    // A GET entry under the same path and query must not answer other methods.
    seed(&cache, &get("/api/posts"), "cached", chrono::Duration::seconds(5));

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
        let parts = RequestParts::new(method, &Uri::from_static("/api/posts"));
        assert_eq!(cache.plan(&parts), CachePlan::Bypass);
        let (response, status) = cache.call(&parts, (), counting(&calls, "ok")).await;
        assert_eq!(status, CacheStatus::Bypass);
        assert_eq!(response.unwrap().body, Bytes::from_static(b"ok"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(cache.store().len(), 1);

    let (response, status) = cache.call(&get("/api/posts"), (), counting(&calls, "new")).await;
    assert_eq!(status, CacheStatus::Hit);
    assert_eq!(response.unwrap().body, Bytes::from_static(b"cached"));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn no_cache_route_is_never_stored() {
    let cache = Cache::default();
    cache.register_strategy("/api/login", None);
    let calls = Arc::new(AtomicUsize::new(0));
    let parts = get("/api/login?user=a");

    for _ in 0..2 {
        let (_, status) = cache.call(&parts, (), counting(&calls, "token")).await;
        assert_eq!(status, CacheStatus::Bypass);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.store().is_empty());
}

#[tokio::test]
async fn handler_errors_propagate_and_are_not_cached() {
    let cache = Cache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let parts = get("/api/report");

    let (response, status) = cache.call(&parts, (), failing(&calls)).await;
    assert_eq!(status, CacheStatus::Miss);
    assert_eq!(response.unwrap_err().to_string(), "database unavailable");
    assert!(cache.store().is_empty());

    let (response, status) = cache.call(&parts, (), counting(&calls, "ok")).await;
    assert_eq!(status, CacheStatus::Miss);
    assert!(response.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_ok_responses_are_returned_but_not_cached() {
    let cache = Cache::default();
    let parts = get("/api/missing");
    let handler = || {
        upstream_fn(|()| async {
            Ok::<_, io::Error>(CachedResponse::new(StatusCode::NOT_FOUND, None, "nope"))
        })
    };

    let (response, status) = cache.call(&parts, (), handler()).await;
    assert_eq!(status, CacheStatus::Miss);
    assert_eq!(response.unwrap().status, StatusCode::NOT_FOUND);
    assert!(cache.store().is_empty());
}

#[tokio::test]
async fn failed_refresh_releases_token_and_keeps_stale_entry() {
    let cache = Cache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let parts = get("/api/stats");
    seed(&cache, &parts, "old", chrono::Duration::minutes(5));

    let (response, status) = cache.call(&parts, (), failing(&calls)).await;
    assert_eq!(status, CacheStatus::Stale);
    assert_eq!(response.unwrap().body, Bytes::from_static(b"old"));

    cache.pool().wait_all().await;
    assert!(cache.tokens().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The next stale hit tries again.
    let (_, status) = cache.call(&parts, (), failing(&calls)).await;
    assert_eq!(status, CacheStatus::Stale);
    cache.pool().wait_all().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn hung_refresh_is_cancelled_by_deadline() {
    let cache = Cache::builder()
        .refresh(
            RefreshConfig::builder()
                .timeout_policy(TimeoutPolicy::Cancel(Duration::from_secs(5)))
                .build(),
        )
        .build();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let parts = get("/api/slow");
    seed(&cache, &parts, "old", chrono::Duration::minutes(5));

    let (_, status) = cache.call(&parts, (), gated(&calls, &gate, "new")).await;
    assert_eq!(status, CacheStatus::Stale);
    assert_eq!(cache.tokens().len(), 1);

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(cache.tokens().is_empty());
    let (response, status) = cache.call(&parts, (), gated(&calls, &gate, "new")).await;
    assert_eq!(status, CacheStatus::Stale);
    assert_eq!(response.unwrap().body, Bytes::from_static(b"old"));
    cache.pool().cancel_all();
}

#[tokio::test]
async fn custom_freshness_threshold() {
    let cache = Cache::builder()
        .policy(
            PolicyConfig::builder()
                .freshness(Duration::from_secs(600))
                .build(),
        )
        .build();
    let calls = Arc::new(AtomicUsize::new(0));
    let parts = get("/api/daily");
    seed(&cache, &parts, "cached", chrono::Duration::minutes(5));

    let (_, status) = cache.call(&parts, (), counting(&calls, "new")).await;
    assert_eq!(status, CacheStatus::Hit);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn route_strategy_controls_fingerprint() {
    let cache = Cache::builder()
        .route("/api/search", Strategy::custom(IgnoreParams::new(["trace_id"])))
        .build();
    let calls = Arc::new(AtomicUsize::new(0));

    let (_, status) = cache
        .call(&get("/api/search?q=rust&trace_id=1"), (), counting(&calls, "r"))
        .await;
    assert_eq!(status, CacheStatus::Miss);

    let (_, status) = cache
        .call(&get("/api/search?trace_id=2&q=rust"), (), counting(&calls, "r"))
        .await;
    assert_eq!(status, CacheStatus::Hit);

    let (_, status) = cache
        .call(&get("/api/search?q=go"), (), counting(&calls, "r"))
        .await;
    assert_eq!(status, CacheStatus::Miss);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
