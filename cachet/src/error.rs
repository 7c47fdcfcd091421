//! Configuration errors.

use thiserror::Error;

/// Error raised while loading or applying [`CacheSettings`](crate::CacheSettings).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("invalid cache configuration: {0}")]
    Parse(String),
    /// A setting has a value outside its valid range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Setting name.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
    /// The requested compression codec is not compiled in.
    #[error("{0} compression requested but the `{0}` feature is not enabled")]
    CompressionUnavailable(&'static str),
}
