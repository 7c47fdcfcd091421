//! The [`CacheStore`] trait and lookup results.

use std::sync::Arc;

use cachet_core::{CachedResponse, Fingerprint};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::compressor::CompressionError;
use crate::entry::StoredResponse;

/// Result of a store lookup.
///
/// Corrupt entries are reported separately from absent ones so callers can log
/// them, but both mean "no usable cached response".
#[derive(Debug)]
pub enum Lookup {
    /// A valid entry exists.
    Found(StoredResponse),
    /// No entry for the key.
    NotFound,
    /// An entry existed but could not be restored. It has been dropped.
    Corrupt(CorruptionReason),
}

impl Lookup {
    /// Returns the stored response if the lookup found one.
    pub fn found(self) -> Option<StoredResponse> {
        match self {
            Lookup::Found(stored) => Some(stored),
            Lookup::NotFound | Lookup::Corrupt(_) => None,
        }
    }

    /// Returns `true` for [`Lookup::Found`].
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Why an entry could not be restored.
#[derive(Debug, Error)]
pub enum CorruptionReason {
    /// The payload does not decompress.
    #[error(transparent)]
    Decompression(CompressionError),
    /// The decompressed body length differs from the recorded length.
    #[error("body length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Recorded length.
        expected: usize,
        /// Decompressed length.
        actual: usize,
    },
    /// The recorded status code is out of range.
    #[error("invalid status code {0}")]
    InvalidStatus(u16),
    /// The recorded content type is not a valid header value.
    #[error("invalid content type")]
    InvalidContentType,
}

/// Bounded, internally synchronised response store.
///
/// All operations are in-memory and never block on I/O.
pub trait CacheStore: Send + Sync {
    /// Looks up `key`, marking it most recently used when found.
    fn get(&self, key: &Fingerprint) -> Lookup;

    /// Writes `response` under `key` with an explicit timestamp.
    ///
    /// Replaces any existing entry and evicts the least recently used entry when
    /// the store is full.
    fn put_at(&self, key: Fingerprint, response: &CachedResponse, stored_at: DateTime<Utc>);

    /// Writes `response` under `key`, stamped with the current time.
    fn put(&self, key: Fingerprint, response: &CachedResponse) {
        self.put_at(key, response, Utc::now());
    }

    /// Removes `key`, returning `true` if it was present.
    fn remove(&self, key: &Fingerprint) -> bool;

    /// Drops every entry.
    fn clear(&self);

    /// Number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    fn capacity(&self) -> usize;
}

impl<T> CacheStore for Arc<T>
where
    T: CacheStore + ?Sized,
{
    fn get(&self, key: &Fingerprint) -> Lookup {
        self.as_ref().get(key)
    }

    fn put_at(&self, key: Fingerprint, response: &CachedResponse, stored_at: DateTime<Utc>) {
        self.as_ref().put_at(key, response, stored_at)
    }

    fn remove(&self, key: &Fingerprint) -> bool {
        self.as_ref().remove(key)
    }

    fn clear(&self) {
        self.as_ref().clear()
    }

    fn len(&self) -> usize {
        self.as_ref().len()
    }

    fn capacity(&self) -> usize {
        self.as_ref().capacity()
    }
}
