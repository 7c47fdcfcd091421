//! Store metrics.
//!
//! Enable the `metrics` feature to record them.
//!
//! ## Metrics
//!
//! - `cachet_store_evictions_total` - Entries evicted to make room (counter)
//! - `cachet_store_corrupt_total` - Corrupt entries dropped on read (counter)
//! - `cachet_store_bytes_written_total` - Compressed bytes written (counter)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of LRU evictions.
    pub static ref STORE_EVICTIONS: &'static str = {
        metrics::describe_counter!(
            "cachet_store_evictions_total",
            "Total number of entries evicted from the store."
        );
        "cachet_store_evictions_total"
    };
    /// Track number of corrupt entries dropped.
    pub static ref STORE_CORRUPT: &'static str = {
        metrics::describe_counter!(
            "cachet_store_corrupt_total",
            "Total number of corrupt entries dropped from the store."
        );
        "cachet_store_corrupt_total"
    };
    /// Track compressed bytes written.
    pub static ref STORE_BYTES_WRITTEN: &'static str = {
        metrics::describe_counter!(
            "cachet_store_bytes_written_total",
            "Total compressed bytes written to the store."
        );
        "cachet_store_bytes_written_total"
    };
}

/// Record one eviction.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_eviction(compressor: &'static str) {
    metrics::counter!(*STORE_EVICTIONS, "compressor" => compressor).increment(1);
}

/// Record one eviction (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_eviction(_compressor: &'static str) {}

/// Record one corrupt entry.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_corrupt(compressor: &'static str) {
    metrics::counter!(*STORE_CORRUPT, "compressor" => compressor).increment(1);
}

/// Record one corrupt entry (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_corrupt(_compressor: &'static str) {}

/// Record a write of `bytes` compressed bytes.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_write(compressor: &'static str, bytes: usize) {
    metrics::counter!(*STORE_BYTES_WRITTEN, "compressor" => compressor).increment(bytes as u64);
}

/// Record a write (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_write(_compressor: &'static str, _bytes: usize) {}
