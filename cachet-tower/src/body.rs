//! Cached and passthrough response bodies.
//!
//! Responses that went through the cache are fully buffered, so they are
//! replayed as a single frame. Bypassed responses keep the inner service's
//! body and stream it unchanged.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project::pin_project;

use crate::BoxError;

/// Body of a response returned by [`CacheService`](crate::CacheService).
#[pin_project(project = CacheBodyProj)]
#[derive(Debug)]
pub enum CacheBody<B> {
    /// Buffered body, yielded once then `None`.
    Complete(Option<Bytes>),
    /// Body of a bypassed response, forwarded as-is.
    Passthrough(#[pin] B),
}

impl<B> CacheBody<B> {
    /// A buffered body holding `bytes`.
    pub fn complete(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            CacheBody::Complete(None)
        } else {
            CacheBody::Complete(Some(bytes))
        }
    }
}

impl<B> HttpBody for CacheBody<B>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            CacheBodyProj::Complete(data) => {
                Poll::Ready(data.take().map(|bytes| Ok(Frame::data(bytes))))
            }
            CacheBodyProj::Passthrough(body) => match body.poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(error))) => Poll::Ready(Some(Err(error.into()))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            CacheBody::Complete(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            CacheBody::Complete(None) => SizeHint::with_exact(0),
            CacheBody::Passthrough(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            CacheBody::Complete(data) => data.is_none(),
            CacheBody::Passthrough(body) => body.is_end_stream(),
        }
    }
}
