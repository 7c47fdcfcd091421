//! Error types for request fingerprinting.

use thiserror::Error;

/// Error raised when a request cannot be turned into a [`Fingerprint`](crate::Fingerprint).
///
/// The cache layer never surfaces this error to clients: a request that cannot be
/// fingerprinted simply bypasses the cache.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The query string is not valid `application/x-www-form-urlencoded` data.
    #[error("invalid query string `{query}`")]
    InvalidQuery {
        /// The raw query string.
        query: String,
        /// Underlying decoding error.
        #[source]
        source: serde_urlencoded::de::Error,
    },
}
