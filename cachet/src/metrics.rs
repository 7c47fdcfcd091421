//! Metrics declaration and recording.
//!
//! Enable the `metrics` feature to record them. Without it every `record_*`
//! function is a no-op.

use std::time::Duration;

use crate::context::CacheStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Cache status metrics

    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_hit_total",
            "Total number of fresh cache hits."
        );
        "cachet_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_miss_total",
            "Total number of cache misses."
        );
        "cachet_cache_miss_total"
    };
    /// Track number of cache stale events.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_stale_total",
            "Total number of stale entries served."
        );
        "cachet_cache_stale_total"
    };
    /// Track number of requests that bypassed the cache.
    pub static ref CACHE_BYPASS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_bypass_total",
            "Total number of requests that bypassed the cache."
        );
        "cachet_cache_bypass_total"
    };

    // Latency metrics

    /// Metric of upstream handling timings.
    pub static ref UPSTREAM_DURATION: &'static str = {
        metrics::describe_histogram!(
            "cachet_upstream_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of upstream handler calls in seconds."
        );
        "cachet_upstream_duration_seconds"
    };

    // Refresh metrics

    /// Track number of refreshes spawned.
    pub static ref REFRESH_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "cachet_refresh_spawned_total",
            "Total number of background refreshes spawned."
        );
        "cachet_refresh_spawned_total"
    };
    /// Track number of refreshes that stored a new entry.
    pub static ref REFRESH_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "cachet_refresh_completed_total",
            "Total number of background refreshes that completed successfully."
        );
        "cachet_refresh_completed_total"
    };
    /// Track number of refreshes whose handler failed.
    pub static ref REFRESH_FAILED: &'static str = {
        metrics::describe_counter!(
            "cachet_refresh_failed_total",
            "Total number of background refreshes whose handler failed."
        );
        "cachet_refresh_failed_total"
    };
    /// Track number of refreshes cancelled by their deadline.
    pub static ref REFRESH_TIMEOUT: &'static str = {
        metrics::describe_counter!(
            "cachet_refresh_timeout_total",
            "Total number of background refreshes cancelled due to timeout."
        );
        "cachet_refresh_timeout_total"
    };
    /// Track number of stale hits that found a refresh already in flight.
    pub static ref REFRESH_DEDUPLICATED: &'static str = {
        metrics::describe_counter!(
            "cachet_refresh_deduplicated_total",
            "Total number of refreshes skipped because one was already in flight."
        );
        "cachet_refresh_deduplicated_total"
    };
    /// Track number of refreshes rejected by a saturated pool.
    pub static ref REFRESH_REJECTED: &'static str = {
        metrics::describe_counter!(
            "cachet_refresh_rejected_total",
            "Total number of refreshes rejected because the pool was saturated."
        );
        "cachet_refresh_rejected_total"
    };
    /// Gauge of currently running refreshes.
    pub static ref REFRESH_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "cachet_refresh_active",
            "Number of currently running background refreshes."
        );
        "cachet_refresh_active"
    };
}

/// Record the outcome of an orchestrated request.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_status(status: CacheStatus) {
    let name = match status {
        CacheStatus::Hit => *CACHE_HIT_COUNTER,
        CacheStatus::Miss => *CACHE_MISS_COUNTER,
        CacheStatus::Stale => *CACHE_STALE_COUNTER,
        CacheStatus::Bypass => *CACHE_BYPASS_COUNTER,
    };
    metrics::counter!(name).increment(1);
}

/// Record the outcome of an orchestrated request (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_status(_status: CacheStatus) {}

/// Record an upstream call duration.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_upstream(duration: Duration, refresh: bool) {
    let kind = if refresh { "refresh" } else { "request" };
    metrics::histogram!(*UPSTREAM_DURATION, "kind" => kind).record(duration.as_secs_f64());
}

/// Record an upstream call duration (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_upstream(_duration: Duration, _refresh: bool) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_refresh_spawned() {
    metrics::counter!(*REFRESH_SPAWNED).increment(1);
    metrics::gauge!(*REFRESH_ACTIVE).increment(1.0);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_refresh_spawned() {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_refresh_finished() {
    metrics::gauge!(*REFRESH_ACTIVE).decrement(1.0);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_refresh_finished() {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_refresh_result(success: bool) {
    let name = if success {
        *REFRESH_COMPLETED
    } else {
        *REFRESH_FAILED
    };
    metrics::counter!(name).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_refresh_result(_success: bool) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_refresh_timeout() {
    metrics::counter!(*REFRESH_TIMEOUT).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_refresh_timeout() {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_refresh_deduplicated() {
    metrics::counter!(*REFRESH_DEDUPLICATED).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_refresh_deduplicated() {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_refresh_rejected() {
    metrics::counter!(*REFRESH_REJECTED).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_refresh_rejected() {}
