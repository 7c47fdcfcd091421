use std::fmt;
use std::task::{Context, Poll};

use bytes::Bytes;
use cachet::{Cache, CachePlan, CacheStatus, CacheStore, metrics};
use cachet_core::RequestParts;
use futures::future::BoxFuture;
use http::header::HeaderName;
use http::{Request, Response};
use http_body::Body as HttpBody;
use tower::{Service, ServiceExt};
use tracing::debug;

use crate::BoxError;
use crate::body::CacheBody;
use crate::cache_status::CacheStatusExt;
use crate::upstream::TowerUpstream;

/// Tower service that answers cacheable requests from a [`Cache`].
///
/// Bypassed requests are forwarded to the inner service and its response body
/// is streamed back unchanged. Requests planned for lookup are served by
/// [`Cache::serve`]; their responses are buffered and tagged with the cache
/// status header.
pub struct CacheService<S, St> {
    inner: S,
    cache: Cache<St>,
    status_header: HeaderName,
}

impl<S, St> CacheService<S, St> {
    /// Wraps `inner`.
    pub fn new(inner: S, cache: Cache<St>, status_header: HeaderName) -> Self {
        Self {
            inner,
            cache,
            status_header,
        }
    }

    /// The shared cache.
    pub fn cache(&self) -> &Cache<St> {
        &self.cache
    }
}

impl<S, St> Clone for CacheService<S, St>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cache: self.cache.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

impl<S, St> fmt::Debug for CacheService<S, St>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("inner", &self.inner)
            .field("cache", &self.cache)
            .field("status_header", &self.status_header)
            .finish()
    }
}

impl<S, St, ReqBody, ResBody> Service<Request<ReqBody>> for CacheService<S, St>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    St: CacheStore + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<CacheBody<ResBody>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // Keep the service that was driven to readiness.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        let parts = RequestParts::from_request(&req);
        match self.cache.plan(&parts) {
            CachePlan::Bypass => {
                debug!(method = %parts.method(), path = parts.path(), "Bypassing cache");
                metrics::record_status(CacheStatus::Bypass);
                Box::pin(async move {
                    let response = inner.oneshot(req).await.map_err(Into::into)?;
                    Ok(response.map(CacheBody::Passthrough))
                })
            }
            CachePlan::Lookup(fingerprint) => {
                let cache = self.cache.clone();
                let status_header = self.status_header.clone();
                Box::pin(async move {
                    let upstream = TowerUpstream::new(inner);
                    let (result, status) = cache.serve(fingerprint, req, upstream).await;
                    let mut response = result?.map(|body: Bytes| CacheBody::complete(body));
                    response.cache_status(status, &status_header);
                    Ok(response)
                })
            }
        }
    }
}
