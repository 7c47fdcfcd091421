//! Request descriptors used for cache identity.
//!
//! [`RequestParts`] captures only what the fingerprint needs (method, path and the
//! raw query string). Parsing the query is deferred to [`RequestParts::params`] so
//! requests that bypass the cache never pay for it.

use http::{Method, Request, Uri};
use smol_str::SmolStr;

use crate::FingerprintError;

/// The parts of an HTTP request that participate in cache identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParts {
    method: Method,
    path: SmolStr,
    query: Option<String>,
}

impl RequestParts {
    /// Creates request parts from a method and URI.
    pub fn new(method: Method, uri: &Uri) -> Self {
        Self {
            method,
            path: SmolStr::new(uri.path()),
            query: uri.query().map(str::to_owned),
        }
    }

    /// Captures the identity-relevant parts of an `http::Request`.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(request.method().clone(), request.uri())
    }

    /// HTTP method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URL path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Decodes the query string into parameters.
    pub fn params(&self) -> Result<QueryParams, FingerprintError> {
        match self.query() {
            Some(query) => QueryParams::parse(query),
            None => Ok(QueryParams::default()),
        }
    }
}

/// Decoded query parameters in their original order.
///
/// Repeated keys are kept as separate pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parses an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Result<Self, FingerprintError> {
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map(Self)
            .map_err(|source| FingerprintError::InvalidQuery {
                query: query.to_owned(),
                source,
            })
    }

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    /// Number of pairs, including repeated keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
