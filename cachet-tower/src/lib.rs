//! Tower middleware for the cachet response cache.
//!
//! [`CacheLayer`] wraps any `tower::Service<http::Request<B>>` with a
//! [`cachet::Cache`]. Cacheable `GET` requests go through the cache: hits are
//! replayed from the store, misses call the inner service and buffer its
//! response. Everything else is passed through untouched, streaming body
//! included.
//!
//! # Quick Start
//!
//! ```
//! use std::convert::Infallible;
//!
//! use bytes::Bytes;
//! use cachet::Cache;
//! use cachet_tower::CacheLayer;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use tower::{ServiceBuilder, service_fn};
//!
//! let service = ServiceBuilder::new()
//!     .layer(CacheLayer::new(Cache::default()))
//!     .service(service_fn(|_req: Request<Full<Bytes>>| async {
//!         Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"hello"))))
//!     }));
//! # drop(service);
//! ```
//!
//! # Response Headers
//!
//! Responses served through the cache carry a status header:
//!
//! | Header Value | Meaning |
//! |--------------|---------|
//! | `HIT` | Fresh entry replayed from the cache |
//! | `MISS` | Produced by the inner service (stored if `200 OK`) |
//! | `STALE` | Stale entry replayed; a background refresh may be running |
//!
//! Bypassed requests get no header. The default name is `x-cache-status`; see
//! [`CacheLayer::status_header`].

#![warn(missing_docs)]

/// Response body returned by the cache service.
pub mod body;
/// Cache status header helpers.
pub mod cache_status;
/// Tower layer holding the cache.
pub mod layer;
/// The Tower service that performs caching.
pub mod service;
/// Adapter calling a Tower service as a cache upstream.
pub mod upstream;

pub use body::CacheBody;
pub use cache_status::{CacheStatusExt, DEFAULT_CACHE_STATUS_HEADER};
pub use layer::CacheLayer;
pub use service::CacheService;
pub use upstream::TowerUpstream;

/// Boxed error returned by [`CacheService`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
