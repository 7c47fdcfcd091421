//! Attaching the cache status to HTTP responses.

use cachet::CacheStatus;
use http::header::HeaderName;
use http::{HeaderValue, Response};

/// Default header name for cache status (HIT/MISS/STALE).
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Header value for `status`.
pub fn header_value(status: CacheStatus) -> HeaderValue {
    match status {
        CacheStatus::Hit => HeaderValue::from_static("HIT"),
        CacheStatus::Miss => HeaderValue::from_static("MISS"),
        CacheStatus::Stale => HeaderValue::from_static("STALE"),
        CacheStatus::Bypass => HeaderValue::from_static("BYPASS"),
    }
}

/// Records a [`CacheStatus`] on a response.
pub trait CacheStatusExt {
    /// Sets `header` to the value of `status`, replacing any previous value.
    fn cache_status(&mut self, status: CacheStatus, header: &HeaderName);
}

impl<B> CacheStatusExt for Response<B> {
    fn cache_status(&mut self, status: CacheStatus, header: &HeaderName) {
        self.headers_mut()
            .insert(header.clone(), header_value(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_replaces_existing_header() {
        let mut response = Response::builder()
            .header(DEFAULT_CACHE_STATUS_HEADER, "HIT")
            .body(())
            .unwrap();
        response.cache_status(CacheStatus::Stale, &DEFAULT_CACHE_STATUS_HEADER);

        let values: Vec<_> = response
            .headers()
            .get_all(DEFAULT_CACHE_STATUS_HEADER)
            .iter()
            .collect();
        assert_eq!(values, vec![HeaderValue::from_static("STALE")]);
    }
}
