//! Canonical request fingerprints.
//!
//! A [`Fingerprint`] identifies a cacheable request by its semantically significant
//! parts. Two requests with the same method, path and non-excluded parameter
//! multiset always produce the same fingerprint, whatever the parameter order and
//! whatever the values of the excluded parameters.
//!
//! ## Format
//!
//! The default fingerprint is the lowercase hex SHA-256 digest of
//! `method + path + canonical_query`, so it is always 64 characters long.

use std::fmt;
use std::sync::Arc;

use http::Method;
use sha2::{Digest, Sha256};

use crate::QueryParams;

/// Parameters that never take part in the fingerprint.
///
/// They carry request authentication (checked upstream of the cache) and are
/// irrelevant to response identity.
pub const EXCLUDED_PARAMS: [&str; 4] = ["from", "sign", "nonce", "timestamp"];

/// Opaque, fixed-form cache key for a request.
///
/// `Fingerprint` wraps its string in an [`Arc`], so cloning only bumps a
/// reference count.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Arc<str>);

impl Fingerprint {
    /// Wraps an already computed key.
    ///
    /// Custom strategies use this when they derive keys on their own.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Hashes arbitrary input into a hex SHA-256 fingerprint.
    pub fn digest(input: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(Sha256::digest(input.as_ref())).into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fingerprint").field(&&*self.0).finish()
    }
}

impl serde::Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds the canonical query representation.
///
/// Pairs whose key is in `excluded` are dropped, the rest are sorted by key (then
/// by value, so repeated keys are order independent) and concatenated as
/// `key=value` with no separator. This is the same canonical form request
/// signatures are computed over.
pub fn canonical_query<'a, I>(params: I, excluded: &[&str]) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params
        .into_iter()
        .filter(|(key, _)| !excluded.contains(key))
        .collect();
    pairs.sort_unstable();

    let capacity = pairs.iter().map(|(k, v)| k.len() + v.len() + 1).sum();
    let mut canonical = String::with_capacity(capacity);
    for (key, value) in pairs {
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(value);
    }
    canonical
}

/// Computes the default fingerprint of a request.
pub fn compute_fingerprint(method: &Method, path: &str, params: &QueryParams) -> Fingerprint {
    fingerprint_excluding(method, path, params, &EXCLUDED_PARAMS)
}

pub(crate) fn fingerprint_excluding(
    method: &Method,
    path: &str,
    params: &QueryParams,
    excluded: &[&str],
) -> Fingerprint {
    let canonical = canonical_query(params.iter(), excluded);
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(path.as_bytes());
    hasher.update(canonical.as_bytes());
    Fingerprint(hex::encode(hasher.finalize()).into())
}
