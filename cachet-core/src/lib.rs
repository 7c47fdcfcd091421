#![warn(missing_docs)]
//! # cachet-core
//!
//! Request identity for the cachet response cache.
//!
//! This crate answers one question: *which cached response does a request map to?*
//! It provides:
//!
//! - [`RequestParts`] and [`QueryParams`] are the parts of an HTTP request that take
//!   part in cache identity
//! - [`Fingerprint`] and [`compute_fingerprint`] build the canonical, order-independent
//!   request key
//! - [`KeyStrategy`] and [`Strategy`] define per-route fingerprint algorithms, including
//!   the [`Strategy::NoCache`] sentinel
//! - [`StrategyRegistry`] maps route paths to strategies
//! - [`CachedResponse`] and [`CacheableResponse`] describe the replayable response snapshot
//!
//! ## Canonical form
//!
//! The default algorithm drops the authentication parameters listed in
//! [`EXCLUDED_PARAMS`], sorts the rest and concatenates them as `key=value`
//! without separators, then hashes `method + path + canonical`:
//!
//! ```
//! use cachet_core::{QueryParams, canonical_query, compute_fingerprint, EXCLUDED_PARAMS};
//! use http::Method;
//!
//! let a = QueryParams::parse("page=2&tag=go&sign=abc123&nonce=xyz").unwrap();
//! let b = QueryParams::parse("tag=go&page=2&nonce=999&sign=def456").unwrap();
//!
//! assert_eq!(canonical_query(a.iter(), &EXCLUDED_PARAMS), "page=2tag=go");
//! assert_eq!(
//!     compute_fingerprint(&Method::GET, "/api/posts", &a),
//!     compute_fingerprint(&Method::GET, "/api/posts", &b),
//! );
//! ```

pub mod error;
pub mod fingerprint;
pub mod registry;
pub mod request;
pub mod response;
pub mod strategy;

pub use error::FingerprintError;
pub use fingerprint::{EXCLUDED_PARAMS, Fingerprint, canonical_query, compute_fingerprint};
pub use registry::StrategyRegistry;
pub use request::{QueryParams, RequestParts};
pub use response::{CacheableResponse, CachedResponse};
pub use strategy::{DefaultAlgorithm, IgnoreParams, KeyStrategy, Strategy};
