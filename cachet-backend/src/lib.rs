#![warn(missing_docs)]
//! # cachet-backend
//!
//! Storage for the cachet response cache.
//!
//! The [`CacheStore`] trait describes a bounded, internally synchronised store
//! keyed by [`Fingerprint`](cachet_core::Fingerprint). [`LruStore`] is the
//! in-memory implementation: it evicts the least recently used entry on overflow
//! and compresses payloads transparently through a [`Compressor`].
//!
//! Lookups return an explicit [`Lookup`]: `Found`, `NotFound` or `Corrupt`. A
//! corrupt entry is dropped from the store and reported, and callers treat it as
//! a miss.

pub mod compressor;
pub mod entry;
mod lock;
pub mod lru_store;
pub mod metrics;
pub mod store;

#[cfg(feature = "zstd")]
pub use compressor::ZstdCompressor;
pub use compressor::{CompressionError, Compressor, GzipCompressor, PassthroughCompressor};
pub use entry::{CacheEntry, EntryMeta, StoredResponse};
pub use lru_store::{DEFAULT_CAPACITY, LruStore, LruStoreBuilder, StoreStats};
pub use store::{CacheStore, CorruptionReason, Lookup};
