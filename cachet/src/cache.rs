//! Request-time orchestration.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use cachet_backend::{CacheStore, LruStore};
use cachet_core::{
    CacheableResponse, Fingerprint, KeyStrategy, RequestParts, Strategy, StrategyRegistry,
};
use chrono::Utc;
use http::Method;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::context::CacheStatus;
use crate::metrics;
use crate::policy::{CacheState, PolicyConfig};
use crate::refresh::{RefreshConfig, RefreshPool, RefreshTokens};
use crate::upstream::Upstream;

/// What the cache will do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePlan {
    /// Not eligible: call the handler directly.
    Bypass,
    /// Eligible: look up (and populate) this fingerprint.
    Lookup(Fingerprint),
}

/// The response cache.
///
/// A `Cache` bundles the store, the strategy registry, the staleness policy and
/// the refresh machinery. It is built once and shared: clones are cheap and
/// refer to the same state.
///
/// # Request flow
///
/// 1. Non-`GET` requests and routes registered as [`Strategy::NoCache`] bypass
///    the cache entirely.
/// 2. The route strategy computes the [`Fingerprint`].
/// 3. A fresh entry is returned without calling the handler.
/// 4. A stale entry is returned immediately; the first request to see it also
///    starts a background refresh.
/// 5. On a miss the handler is called and a `200 OK` result is stored.
///
/// Handler errors are returned unchanged and never cached.
pub struct Cache<St = LruStore> {
    store: Arc<St>,
    registry: Arc<StrategyRegistry>,
    policy: PolicyConfig,
    tokens: Arc<RefreshTokens>,
    pool: RefreshPool,
}

impl<St> Clone for Cache<St> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            policy: self.policy,
            tokens: Arc::clone(&self.tokens),
            pool: self.pool.clone(),
        }
    }
}

impl<St> fmt::Debug for Cache<St> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("refreshing", &self.tokens.len())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl Cache<LruStore> {
    /// Starts building a cache backed by an [`LruStore`].
    pub fn builder() -> CacheBuilder<LruStore> {
        CacheBuilder::new(LruStore::default())
    }
}

impl Default for Cache<LruStore> {
    fn default() -> Self {
        Cache::builder().build()
    }
}

impl<St> Cache<St> {
    /// The entry store.
    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    /// The route strategy registry.
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// The staleness policy.
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// In-flight refresh tokens.
    pub fn tokens(&self) -> &Arc<RefreshTokens> {
        &self.tokens
    }

    /// The background refresh pool.
    pub fn pool(&self) -> &RefreshPool {
        &self.pool
    }

    /// Registers the key strategy for `path`; `None` disables caching for it.
    pub fn register_strategy(
        &self,
        path: impl Into<SmolStr>,
        strategy: Option<Arc<dyn KeyStrategy>>,
    ) {
        self.registry.register(path, strategy);
    }

    /// Decides whether `parts` is served through the cache.
    ///
    /// Never fails: a request whose fingerprint cannot be computed bypasses the
    /// cache with a warning.
    pub fn plan(&self, parts: &RequestParts) -> CachePlan {
        if *parts.method() != Method::GET {
            return CachePlan::Bypass;
        }
        let strategy = self.registry.resolve(parts.path());
        let Some(algorithm) = strategy.algorithm() else {
            debug!(path = parts.path(), "Caching disabled for route");
            return CachePlan::Bypass;
        };
        match algorithm.fingerprint(parts) {
            Ok(fingerprint) => CachePlan::Lookup(fingerprint),
            Err(error) => {
                warn!(path = parts.path(), %error, "Cannot fingerprint request, bypassing cache");
                CachePlan::Bypass
            }
        }
    }
}

impl<St> Cache<St>
where
    St: CacheStore + 'static,
{
    /// Serves `request` through the cache.
    ///
    /// `parts` must describe `request`. Returns the response together with how
    /// it was produced.
    pub async fn call<Req, U>(
        &self,
        parts: &RequestParts,
        request: Req,
        mut upstream: U,
    ) -> (Result<U::Response, U::Error>, CacheStatus)
    where
        Req: Send + 'static,
        U: Upstream<Req> + Send + 'static,
        U::Future: 'static,
        U::Response: CacheableResponse + Send + 'static,
        U::Error: fmt::Debug + Send + 'static,
    {
        match self.plan(parts) {
            CachePlan::Bypass => {
                debug!(method = %parts.method(), path = parts.path(), "Bypassing cache");
                metrics::record_status(CacheStatus::Bypass);
                (upstream.call(request).await, CacheStatus::Bypass)
            }
            CachePlan::Lookup(fingerprint) => self.serve(fingerprint, request, upstream).await,
        }
    }

    /// Serves a request already planned as [`CachePlan::Lookup`].
    pub async fn serve<Req, U>(
        &self,
        fingerprint: Fingerprint,
        request: Req,
        mut upstream: U,
    ) -> (Result<U::Response, U::Error>, CacheStatus)
    where
        Req: Send + 'static,
        U: Upstream<Req> + Send + 'static,
        U::Future: 'static,
        U::Response: CacheableResponse + Send + 'static,
        U::Error: fmt::Debug + Send + 'static,
    {
        let lookup = self.store.get(&fingerprint);
        match self.policy.evaluate(lookup, Utc::now()) {
            CacheState::Fresh(stored) => {
                debug!(%fingerprint, "Cache hit");
                metrics::record_status(CacheStatus::Hit);
                let response = <U::Response as CacheableResponse>::from_cached(stored.response);
                (Ok(response), CacheStatus::Hit)
            }
            CacheState::Stale(stored) => {
                debug!(%fingerprint, "Serving stale entry");
                metrics::record_status(CacheStatus::Stale);
                self.refresh(fingerprint, request, upstream);
                let response = <U::Response as CacheableResponse>::from_cached(stored.response);
                (Ok(response), CacheStatus::Stale)
            }
            CacheState::Miss => {
                debug!(%fingerprint, "Cache miss");
                metrics::record_status(CacheStatus::Miss);
                let start = Instant::now();
                let result = upstream.call(request).await;
                metrics::record_upstream(start.elapsed(), false);
                if let Ok(response) = &result {
                    match response.to_cached() {
                        Some(cached) => self.store.put(fingerprint, &cached),
                        None => debug!(%fingerprint, "Response is not cacheable"),
                    }
                }
                (result, CacheStatus::Miss)
            }
        }
    }

    /// Starts a background refresh of `fingerprint` unless one is in flight.
    fn refresh<Req, U>(&self, fingerprint: Fingerprint, request: Req, mut upstream: U)
    where
        Req: Send + 'static,
        U: Upstream<Req> + Send + 'static,
        U::Future: 'static,
        U::Response: CacheableResponse + Send + 'static,
        U::Error: fmt::Debug + Send + 'static,
    {
        let Some(token) = self.tokens.acquire(&fingerprint) else {
            debug!(%fingerprint, "Refresh already in flight");
            metrics::record_refresh_deduplicated();
            return;
        };
        // The entry may have been refreshed between our lookup and the acquire.
        let current = self.store.get(&fingerprint);
        if let CacheState::Fresh(_) = self.policy.evaluate(current, Utc::now()) {
            debug!(%fingerprint, "Entry refreshed concurrently, skipping refresh");
            metrics::record_refresh_deduplicated();
            drop(token);
            return;
        }

        let store = Arc::clone(&self.store);
        let task = async move {
            let start = Instant::now();
            let result = upstream.call(request).await;
            metrics::record_upstream(start.elapsed(), true);
            match result {
                Ok(response) => match response.to_cached() {
                    Some(cached) => {
                        store.put(fingerprint, &cached);
                        debug!("Refreshed stale entry");
                        metrics::record_refresh_result(true);
                    }
                    None => {
                        warn!("Refresh produced a non-cacheable response, keeping stale entry");
                        metrics::record_refresh_result(false);
                    }
                },
                Err(error) => {
                    warn!(?error, "Refresh handler failed, keeping stale entry");
                    metrics::record_refresh_result(false);
                }
            }
        };
        self.pool.submit(token, task);
    }
}

/// Builder for [`Cache`].
#[derive(Debug)]
pub struct CacheBuilder<St> {
    store: St,
    registry: Arc<StrategyRegistry>,
    policy: PolicyConfig,
    refresh: RefreshConfig,
}

impl<St> CacheBuilder<St> {
    /// Starts a builder around `store`.
    pub fn new(store: St) -> Self {
        Self {
            store,
            registry: Arc::new(StrategyRegistry::new()),
            policy: PolicyConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }

    /// Replaces the entry store.
    pub fn store<S2>(self, store: S2) -> CacheBuilder<S2> {
        CacheBuilder {
            store,
            registry: self.registry,
            policy: self.policy,
            refresh: self.refresh,
        }
    }

    /// Uses a shared strategy registry.
    pub fn registry(self, registry: Arc<StrategyRegistry>) -> Self {
        Self { registry, ..self }
    }

    /// Registers a route strategy.
    pub fn route(self, path: impl Into<SmolStr>, strategy: Strategy) -> Self {
        self.registry.register_strategy(path, strategy);
        self
    }

    /// Sets the staleness policy.
    pub fn policy(self, policy: PolicyConfig) -> Self {
        Self { policy, ..self }
    }

    /// Sets the refresh pool configuration.
    pub fn refresh(self, refresh: RefreshConfig) -> Self {
        Self { refresh, ..self }
    }

    /// Builds the cache.
    pub fn build(self) -> Cache<St> {
        Cache {
            store: Arc::new(self.store),
            registry: self.registry,
            policy: self.policy,
            tokens: Arc::new(RefreshTokens::new()),
            pool: RefreshPool::new(self.refresh),
        }
    }
}
