//! Per-route fingerprint strategies.
//!
//! A [`Strategy`] decides how, and whether, a route is cached:
//!
//! - [`Strategy::Default`] fingerprints with [`DefaultAlgorithm`]
//! - [`Strategy::Custom`] delegates to any [`KeyStrategy`]
//! - [`Strategy::NoCache`] marks the route as never cached
//!
//! ## Custom strategies
//!
//! Any `Fn(&RequestParts) -> Result<Fingerprint, FingerprintError>` closure is a
//! [`KeyStrategy`]:
//!
//! ```
//! use cachet_core::{Fingerprint, FingerprintError, RequestParts, Strategy};
//!
//! // Cache a whole listing under one key, whatever the query.
//! let strategy = Strategy::custom(|parts: &RequestParts| -> Result<Fingerprint, FingerprintError> {
//!     Ok(Fingerprint::digest(parts.path()))
//! });
//! assert!(strategy.is_cacheable());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::fingerprint::{EXCLUDED_PARAMS, fingerprint_excluding};
use crate::{Fingerprint, FingerprintError, RequestParts, compute_fingerprint};

/// Computes the cache key of a request.
///
/// Implementations must be pure: the same request parts always yield the same
/// fingerprint.
pub trait KeyStrategy: Send + Sync {
    /// Derives the fingerprint of `request`.
    fn fingerprint(&self, request: &RequestParts) -> Result<Fingerprint, FingerprintError>;
}

impl<F> KeyStrategy for F
where
    F: Fn(&RequestParts) -> Result<Fingerprint, FingerprintError> + Send + Sync,
{
    fn fingerprint(&self, request: &RequestParts) -> Result<Fingerprint, FingerprintError> {
        self(request)
    }
}

/// The default fingerprint algorithm.
///
/// Hashes `method + path + canonical_query` with [`EXCLUDED_PARAMS`] removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAlgorithm;

impl KeyStrategy for DefaultAlgorithm {
    fn fingerprint(&self, request: &RequestParts) -> Result<Fingerprint, FingerprintError> {
        let params = request.params()?;
        Ok(compute_fingerprint(request.method(), request.path(), &params))
    }
}

/// Default algorithm that additionally ignores route-specific parameters.
///
/// Useful for tracking or cache-busting parameters that never change the
/// response body.
#[derive(Debug, Clone, Default)]
pub struct IgnoreParams {
    params: Vec<String>,
}

impl IgnoreParams {
    /// Ignores `params` on top of [`EXCLUDED_PARAMS`].
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

impl KeyStrategy for IgnoreParams {
    fn fingerprint(&self, request: &RequestParts) -> Result<Fingerprint, FingerprintError> {
        let params = request.params()?;
        let excluded: Vec<&str> = EXCLUDED_PARAMS
            .iter()
            .copied()
            .chain(self.params.iter().map(String::as_str))
            .collect();
        Ok(fingerprint_excluding(
            request.method(),
            request.path(),
            &params,
            &excluded,
        ))
    }
}

/// How a route participates in caching.
#[derive(Clone, Default)]
pub enum Strategy {
    /// Fingerprint with [`DefaultAlgorithm`].
    #[default]
    Default,
    /// Fingerprint with a caller supplied algorithm.
    Custom(Arc<dyn KeyStrategy>),
    /// Never cache this route.
    NoCache,
}

impl Strategy {
    /// Wraps a key strategy as [`Strategy::Custom`].
    pub fn custom<K>(strategy: K) -> Self
    where
        K: KeyStrategy + 'static,
    {
        Strategy::Custom(Arc::new(strategy))
    }

    /// Returns `false` only for [`Strategy::NoCache`].
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Strategy::NoCache)
    }

    /// The algorithm to fingerprint with, or `None` if the route is not cached.
    pub fn algorithm(&self) -> Option<&dyn KeyStrategy> {
        static DEFAULT: DefaultAlgorithm = DefaultAlgorithm;
        match self {
            Strategy::Default => Some(&DEFAULT),
            Strategy::Custom(strategy) => Some(strategy.as_ref()),
            Strategy::NoCache => None,
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Default => f.write_str("Default"),
            Strategy::Custom(_) => f.write_str("Custom(..)"),
            Strategy::NoCache => f.write_str("NoCache"),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, Uri};

    use super::*;

    fn parts(uri: &str) -> RequestParts {
        RequestParts::new(Method::GET, &uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn no_cache_has_no_algorithm() {
        assert!(Strategy::NoCache.algorithm().is_none());
        assert!(!Strategy::NoCache.is_cacheable());
        assert!(Strategy::default().is_cacheable());
    }

    #[test]
    fn ignore_params_drops_extra_keys() {
        let strategy = IgnoreParams::new(["utm_source", "_"]);
        let a = strategy
            .fingerprint(&parts("/posts?page=1&utm_source=mail&_=123"))
            .unwrap();
        let b = strategy.fingerprint(&parts("/posts?page=1")).unwrap();
        assert_eq!(a, b);

        let default = DefaultAlgorithm
            .fingerprint(&parts("/posts?page=1&utm_source=mail"))
            .unwrap();
        assert_ne!(a, default);
    }

    #[test]
    fn closure_is_a_key_strategy() {
        let strategy = Strategy::custom(|parts: &RequestParts| {
            Ok::<_, FingerprintError>(Fingerprint::new(parts.path()))
        });
        let fp = strategy
            .algorithm()
            .unwrap()
            .fingerprint(&parts("/a?x=1"))
            .unwrap();
        assert_eq!(fp.as_str(), "/a");
    }
}
