//! Cacheable response types and traits.
//!
//! - [`CachedResponse`] is the snapshot that is stored and replayed
//! - [`CacheableResponse`] converts a response type to and from that snapshot
//!
//! Only `200 OK` responses are cached. Anything else passes through to the client
//! and leaves the cache untouched.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};

/// A replayable response: status, content type and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Response status code.
    pub status: StatusCode,
    /// `Content-Type` header, if the response had one.
    pub content_type: Option<HeaderValue>,
    /// Full response body.
    pub body: Bytes,
}

impl CachedResponse {
    /// Creates a snapshot from its parts.
    pub fn new(status: StatusCode, content_type: Option<HeaderValue>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    /// A `200 OK` snapshot without content type.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, None, body)
    }

    /// A `200 OK` snapshot with `application/json` content type.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(
            StatusCode::OK,
            Some(HeaderValue::from_static("application/json")),
            body,
        )
    }

    /// Returns `true` if this snapshot may be stored.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// Response types the cache can store and replay.
pub trait CacheableResponse: Sized {
    /// Captures a storable snapshot, or `None` if the response must not be cached.
    fn to_cached(&self) -> Option<CachedResponse>;

    /// Rebuilds a response from a snapshot.
    fn from_cached(cached: CachedResponse) -> Self;
}

impl CacheableResponse for CachedResponse {
    fn to_cached(&self) -> Option<CachedResponse> {
        self.is_cacheable().then(|| self.clone())
    }

    fn from_cached(cached: CachedResponse) -> Self {
        cached
    }
}

impl CacheableResponse for Response<Bytes> {
    fn to_cached(&self) -> Option<CachedResponse> {
        if self.status() != StatusCode::OK {
            return None;
        }
        Some(CachedResponse {
            status: self.status(),
            content_type: self.headers().get(CONTENT_TYPE).cloned(),
            body: self.body().clone(),
        })
    }

    fn from_cached(cached: CachedResponse) -> Self {
        let mut response = Response::new(cached.body);
        *response.status_mut() = cached.status;
        if let Some(content_type) = cached.content_type {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        response
    }
}
