//! Per-request cache outcome.

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// Fresh cached data was returned.
    Hit,
    /// No usable cached data; the handler produced the response.
    #[default]
    Miss,
    /// Stale cached data was returned and a refresh may have been started.
    Stale,
    /// The request was not eligible for caching.
    Bypass,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Stale => "stale",
            CacheStatus::Bypass => "bypass",
        }
    }

    /// Returns `true` if the response came from the cache.
    #[inline]
    pub const fn is_cached(&self) -> bool {
        matches!(self, CacheStatus::Hit | CacheStatus::Stale)
    }
}
