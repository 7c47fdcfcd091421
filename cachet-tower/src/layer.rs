use cachet::{Cache, LruStore};
use http::header::HeaderName;
use tower::Layer;

use crate::cache_status::DEFAULT_CACHE_STATUS_HEADER;
use crate::service::CacheService;

/// Tower layer that serves requests through a [`Cache`].
///
/// Every service produced by the layer shares the same cache.
#[derive(Debug)]
pub struct CacheLayer<St = LruStore> {
    cache: Cache<St>,
    status_header: HeaderName,
}

impl<St> Clone for CacheLayer<St> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

impl<St> CacheLayer<St> {
    /// Creates a layer around `cache`.
    pub fn new(cache: Cache<St>) -> Self {
        Self {
            cache,
            status_header: DEFAULT_CACHE_STATUS_HEADER,
        }
    }

    /// Uses `header` instead of `x-cache-status`.
    pub fn status_header(self, header: HeaderName) -> Self {
        Self {
            status_header: header,
            ..self
        }
    }

    /// The shared cache.
    pub fn cache(&self) -> &Cache<St> {
        &self.cache
    }
}

impl<S, St> Layer<S> for CacheLayer<St> {
    type Service = CacheService<S, St>;

    fn layer(&self, inner: S) -> Self::Service {
        CacheService::new(inner, self.cache.clone(), self.status_header.clone())
    }
}
