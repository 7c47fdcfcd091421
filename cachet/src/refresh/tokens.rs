//! Single-flight refresh tokens.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cachet_core::Fingerprint;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Set of fingerprints with a refresh in flight.
///
/// At most one caller owns the token for a fingerprint at any time. Ownership is
/// taken with an atomic test-and-set and released either explicitly or by
/// dropping the [`RefreshToken`] guard.
#[derive(Debug, Default)]
pub struct RefreshTokens {
    in_flight: DashMap<Fingerprint, u64>,
    generation: AtomicU64,
}

impl RefreshTokens {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as refreshing. Returns `false` if it already was.
    pub fn begin_refresh(&self, key: &Fingerprint) -> bool {
        self.try_insert(key).is_some()
    }

    /// Releases `key` unconditionally.
    pub fn end_refresh(&self, key: &Fingerprint) {
        self.in_flight.remove(key);
    }

    /// Takes the token for `key` as a guard that releases it on drop.
    pub fn acquire(self: &Arc<Self>, key: &Fingerprint) -> Option<RefreshToken> {
        self.try_insert(key).map(|generation| RefreshToken {
            tokens: Arc::clone(self),
            key: key.clone(),
            generation,
        })
    }

    /// Returns `true` if a refresh for `key` is in flight.
    pub fn is_in_flight(&self, key: &Fingerprint) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Number of refreshes in flight.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns `true` if nothing is refreshing.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    fn try_insert(&self, key: &Fingerprint) -> Option<u64> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                slot.insert(generation);
                Some(generation)
            }
        }
    }
}

/// Ownership of the refresh for one fingerprint.
///
/// Dropping the token releases the fingerprint, unless it was already released
/// and taken again by someone else.
pub struct RefreshToken {
    tokens: Arc<RefreshTokens>,
    key: Fingerprint,
    generation: u64,
}

impl RefreshToken {
    /// The fingerprint being refreshed.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.key
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken")
            .field("fingerprint", &self.key)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Drop for RefreshToken {
    fn drop(&mut self) {
        let generation = self.generation;
        self.tokens
            .in_flight
            .remove_if(&self.key, |_, current| *current == generation);
    }
}
