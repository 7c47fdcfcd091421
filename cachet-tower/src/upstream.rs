//! Upstream adapter for Tower services.
//!
//! [`TowerUpstream`] lets the cache call the wrapped service on a miss or a
//! background refresh. The response body is collected so it can be stored.

use bytes::Bytes;
use cachet::Upstream;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use tower::{Service, ServiceExt};

use crate::BoxError;

/// Calls a Tower service and buffers its response.
#[derive(Debug, Clone)]
pub struct TowerUpstream<S> {
    service: S,
}

impl<S> TowerUpstream<S> {
    /// Creates a new upstream adapter wrapping the given service.
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S, ReqBody, ResBody> Upstream<Request<ReqBody>> for TowerUpstream<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    ReqBody: Send + 'static,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Bytes>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response<Bytes>, BoxError>>;

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let service = self.service.clone();
        Box::pin(async move {
            let response = service.oneshot(req).await.map_err(Into::into)?;
            let (parts, body) = response.into_parts();
            let bytes = body.collect().await.map_err(Into::into)?.to_bytes();
            Ok(Response::from_parts(parts, bytes))
        })
    }
}
