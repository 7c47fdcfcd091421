//! Single-flight background refresh of stale entries.
//!
//! [`RefreshTokens`] guarantees at most one refresh per fingerprint and
//! [`RefreshPool`] runs those refreshes on a bounded set of workers, each under a
//! deadline.

mod config;
mod pool;
mod tokens;

pub use config::{
    DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT, RefreshConfig, RefreshConfigBuilder, TimeoutPolicy,
};
pub use pool::RefreshPool;
pub use tokens::{RefreshToken, RefreshTokens};
