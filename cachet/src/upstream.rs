//! The downstream handler abstraction.
//!
//! An [`Upstream`] is whatever produces the response when the cache cannot:
//! an application handler, a wrapped tower service, or a test double. It is
//! called synchronously on a miss and detached on a stale refresh.

use std::fmt;
use std::future::Future;

/// Produces responses for requests the cache cannot answer.
pub trait Upstream<Req> {
    /// Successful response type.
    type Response;
    /// Handler error, propagated to the caller unchanged.
    type Error;
    /// Future returned by [`call`](Upstream::call).
    type Future: Future<Output = Result<Self::Response, Self::Error>> + Send;

    /// Handles `req`.
    fn call(&mut self, req: Req) -> Self::Future;
}

/// Returns an [`Upstream`] that calls `f`.
///
/// ```
/// use cachet::{Upstream, upstream_fn};
/// use cachet_core::CachedResponse;
///
/// let mut handler = upstream_fn(|name: String| async move {
///     Ok::<_, std::io::Error>(CachedResponse::ok(format!("hello {name}")))
/// });
/// let _future = handler.call("world".to_owned());
/// ```
pub fn upstream_fn<F>(f: F) -> UpstreamFn<F> {
    UpstreamFn { f }
}

/// An [`Upstream`] backed by a closure. See [`upstream_fn`].
#[derive(Clone, Copy)]
pub struct UpstreamFn<F> {
    f: F,
}

impl<F> fmt::Debug for UpstreamFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamFn")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

impl<F, Fut, Req, Res, E> Upstream<Req> for UpstreamFn<F>
where
    F: FnMut(Req) -> Fut,
    Fut: Future<Output = Result<Res, E>> + Send,
{
    type Response = Res;
    type Error = E;
    type Future = Fut;

    fn call(&mut self, req: Req) -> Self::Future {
        (self.f)(req)
    }
}
