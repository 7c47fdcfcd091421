#![warn(missing_docs)]
//! # cachet
//!
//! An in-process HTTP response cache that sits between a router and its
//! handlers.
//!
//! For cacheable `GET` requests the [`Cache`] computes a canonical request
//! fingerprint, serves a stored response while it is fresh, and otherwise calls
//! the handler and stores its result. Entries past the freshness threshold are
//! still served, immediately, while a single background refresh recomputes them,
//! so a hot key never triggers a stampede of handler calls.
//!
//! ## Example
//!
//! ```
//! use cachet::{Cache, CacheStatus, upstream_fn};
//! use cachet_core::{CachedResponse, RequestParts};
//! use http::{Method, Uri};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = Cache::default();
//! let parts = RequestParts::new(Method::GET, &Uri::from_static("/api/posts?page=2"));
//! let handler = || upstream_fn(|_req: ()| async {
//!     Ok::<_, std::io::Error>(CachedResponse::json(r#"{"posts":[]}"#))
//! });
//!
//! let (_, status) = cache.call(&parts, (), handler()).await;
//! assert_eq!(status, CacheStatus::Miss);
//!
//! let (response, status) = cache.call(&parts, (), handler()).await;
//! assert_eq!(status, CacheStatus::Hit);
//! assert_eq!(response.unwrap().body, r#"{"posts":[]}"#);
//! # }
//! ```
//!
//! ## Crates
//!
//! - `cachet-core`: request fingerprints and route strategies
//! - `cachet-backend`: the bounded LRU store
//! - `cachet-tower`: a tower layer around this crate

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod refresh;
pub mod upstream;

pub use cache::{Cache, CacheBuilder, CachePlan};
pub use config::{CacheSettings, Compression, RefreshSettings, RouteStrategy};
pub use context::CacheStatus;
pub use error::ConfigError;
pub use policy::{CacheState, PolicyConfig};
pub use refresh::{RefreshConfig, RefreshPool, RefreshToken, RefreshTokens, TimeoutPolicy};
pub use upstream::{Upstream, UpstreamFn, upstream_fn};

pub use cachet_backend::{CacheStore, Lookup, LruStore};
pub use cachet_core::{
    CacheableResponse, CachedResponse, Fingerprint, KeyStrategy, RequestParts, Strategy,
    StrategyRegistry,
};
