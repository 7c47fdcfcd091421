//! In-memory LRU store.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use cachet_core::{CachedResponse, Fingerprint};
use chrono::{DateTime, Utc};
use lru::LruCache;
use tracing::{debug, warn};

use crate::compressor::{Compressor, GzipCompressor};
use crate::entry::CacheEntry;
use crate::lock::mutex_lock;
use crate::metrics;
use crate::store::{CacheStore, Lookup};

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Capacity-bounded store with least-recently-used eviction.
///
/// Payloads are compressed on write (gzip by default) and decompressed on read,
/// outside the lock. The store never holds more than [`capacity`](CacheStore::capacity)
/// entries.
///
/// # Example
///
/// ```
/// use cachet_backend::{CacheStore, LruStore};
/// use cachet_core::{CachedResponse, Fingerprint};
///
/// let store = LruStore::new(2);
/// store.put(Fingerprint::new("a"), &CachedResponse::ok("a"));
/// store.put(Fingerprint::new("b"), &CachedResponse::ok("b"));
/// store.put(Fingerprint::new("c"), &CachedResponse::ok("c"));
///
/// assert!(!store.get(&Fingerprint::new("a")).is_found());
/// assert_eq!(store.stats().evictions, 1);
/// ```
pub struct LruStore {
    entries: Mutex<LruCache<Fingerprint, CacheEntry>>,
    compressor: Arc<dyn Compressor>,
    capacity: NonZeroUsize,
    counters: Counters,
}

impl LruStore {
    /// Creates a gzip-compressed store holding at most `capacity` entries.
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// Starts building a store.
    pub fn builder() -> LruStoreBuilder {
        LruStoreBuilder::default()
    }

    /// Snapshot of the store counters.
    pub fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }

    /// The codec used for payloads.
    pub fn compressor(&self) -> &dyn Compressor {
        self.compressor.as_ref()
    }

    /// Drops `key` if it still holds the entry that was found to be corrupt.
    ///
    /// A concurrent writer may have replaced it in the meantime.
    fn evict_corrupt(&self, key: &Fingerprint, corrupt: &CacheEntry) {
        let mut entries = mutex_lock(&self.entries, "evict_corrupt");
        let unchanged = entries
            .peek(key)
            .is_some_and(|current| current.payload.as_ptr() == corrupt.payload.as_ptr());
        if unchanged {
            entries.pop(key);
        }
    }
}

impl Default for LruStore {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for LruStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruStore")
            .field("capacity", &self.capacity)
            .field("compressor", &self.compressor.name())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl CacheStore for LruStore {
    fn get(&self, key: &Fingerprint) -> Lookup {
        let entry = mutex_lock(&self.entries, "get").get(key).cloned();
        let Some(entry) = entry else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return Lookup::NotFound;
        };

        match entry.decode(self.compressor.as_ref()) {
            Ok(stored) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Found(stored)
            }
            Err(reason) => {
                warn!(
                    fingerprint = %key,
                    compressor = self.compressor.name(),
                    error = %reason,
                    "Dropping corrupt cache entry"
                );
                self.evict_corrupt(key, &entry);
                self.counters.corrupt.fetch_add(1, Ordering::Relaxed);
                metrics::record_corrupt(self.compressor.name());
                Lookup::Corrupt(reason)
            }
        }
    }

    fn put_at(&self, key: Fingerprint, response: &CachedResponse, stored_at: DateTime<Utc>) {
        let entry = match CacheEntry::encode(response, stored_at, self.compressor.as_ref()) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(fingerprint = %key, %error, "Skipping cache write");
                return;
            }
        };
        let written = entry.payload_len();

        let replaced = mutex_lock(&self.entries, "put").push(key.clone(), entry);
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        metrics::record_write(self.compressor.name(), written);

        if let Some((evicted, _)) = replaced
            && evicted != key
        {
            debug!(fingerprint = %evicted, "Evicted least recently used entry");
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            metrics::record_eviction(self.compressor.name());
        }
    }

    fn remove(&self, key: &Fingerprint) -> bool {
        mutex_lock(&self.entries, "remove").pop(key).is_some()
    }

    fn clear(&self) {
        mutex_lock(&self.entries, "clear").clear();
    }

    fn len(&self) -> usize {
        mutex_lock(&self.entries, "len").len()
    }

    fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

/// Builder for [`LruStore`].
#[derive(Debug)]
pub struct LruStoreBuilder {
    capacity: usize,
    compressor: Arc<dyn Compressor>,
}

impl Default for LruStoreBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            compressor: Arc::new(GzipCompressor::default()),
        }
    }
}

impl LruStoreBuilder {
    /// Maximum number of entries.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Payload codec.
    pub fn compressor<C>(mut self, compressor: C) -> Self
    where
        C: Compressor + 'static,
    {
        self.compressor = Arc::new(compressor);
        self
    }

    /// Payload codec, shared.
    pub fn shared_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Builds the store.
    pub fn build(self) -> LruStore {
        let capacity = NonZeroUsize::new(self.capacity).unwrap_or_else(|| {
            warn!("Store capacity of zero requested, using 1");
            NonZeroUsize::MIN
        });
        LruStore {
            entries: Mutex::new(LruCache::new(capacity)),
            compressor: self.compressor,
            capacity,
            counters: Counters::default(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    corrupt: AtomicU64,
    writes: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time store counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Lookups that found a valid entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries evicted to make room.
    pub evictions: u64,
    /// Corrupt entries dropped on read.
    pub corrupt: u64,
    /// Successful writes.
    pub writes: u64,
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use bytes::Bytes;

    use super::*;
    use crate::PassthroughCompressor;

    fn key(name: &str) -> Fingerprint {
        Fingerprint::new(name)
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let store = LruStore::new(0);
        assert_eq!(store.capacity(), 1);
        store.put(key("a"), &CachedResponse::ok("a"));
        store.put(key("b"), &CachedResponse::ok("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn overwrite_is_not_an_eviction() {
        let store = LruStore::new(2);
        store.put(key("a"), &CachedResponse::ok("one"));
        store.put(key("a"), &CachedResponse::ok("two"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().evictions, 0);
        let stored = store.get(&key("a")).found().unwrap();
        assert_eq!(stored.response.body, Bytes::from_static(b"two"));
    }

    #[test]
    fn corrupt_entry_is_dropped() {
        let store = LruStore::builder()
            .capacity(4)
            .compressor(PassthroughCompressor)
            .build();
        store.put(key("a"), &CachedResponse::ok("abc"));
        mutex_lock(&store.entries, "test")
            .peek_mut(&key("a"))
            .unwrap()
            .meta
            .content_length = 99;

        assert!(matches!(store.get(&key("a")), Lookup::Corrupt(_)));
        assert!(matches!(store.get(&key("a")), Lookup::NotFound));
        assert_eq!(store.stats().corrupt, 1);
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let store = LruStore::new(4);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.entries.lock().expect("lock should be acquired");
            panic!("poison store lock");
        }));

        store.put(key("a"), &CachedResponse::ok("a"));
        assert!(store.get(&key("a")).is_found());
    }

    #[test]
    fn remove_and_clear() {
        let store = LruStore::new(4);
        store.put(key("a"), &CachedResponse::ok("a"));
        store.put(key("b"), &CachedResponse::ok("b"));

        assert!(store.remove(&key("a")));
        assert!(!store.remove(&key("a")));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }
}
