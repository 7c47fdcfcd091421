//! Stored entry representation.

use bytes::Bytes;
use cachet_core::CachedResponse;
use chrono::{DateTime, Utc};
use http::{HeaderValue, StatusCode};

use crate::compressor::{CompressionError, Compressor};
use crate::store::CorruptionReason;

/// Response context stored next to the compressed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    /// Raw status code.
    pub status: u16,
    /// Raw `Content-Type` header bytes.
    pub content_type: Option<Bytes>,
    /// Length of the uncompressed body.
    pub content_length: usize,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

/// A compressed response as held by the store.
///
/// Entries are immutable. Writing the same key again replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub(crate) payload: Bytes,
    pub(crate) meta: EntryMeta,
}

impl CacheEntry {
    /// Compresses `response` into an entry stamped with `stored_at`.
    pub fn encode(
        response: &CachedResponse,
        stored_at: DateTime<Utc>,
        compressor: &dyn Compressor,
    ) -> Result<Self, CompressionError> {
        let payload = compressor.compress(&response.body)?;
        Ok(Self {
            payload,
            meta: EntryMeta {
                status: response.status.as_u16(),
                content_type: response
                    .content_type
                    .as_ref()
                    .map(|value| Bytes::copy_from_slice(value.as_bytes())),
                content_length: response.body.len(),
                stored_at,
            },
        })
    }

    /// Restores the stored response, validating it along the way.
    pub fn decode(&self, compressor: &dyn Compressor) -> Result<StoredResponse, CorruptionReason> {
        let status = StatusCode::from_u16(self.meta.status)
            .map_err(|_| CorruptionReason::InvalidStatus(self.meta.status))?;
        let content_type = self
            .meta
            .content_type
            .clone()
            .map(HeaderValue::from_maybe_shared)
            .transpose()
            .map_err(|_| CorruptionReason::InvalidContentType)?;
        let body = compressor
            .decompress(&self.payload)
            .map_err(CorruptionReason::Decompression)?;
        if body.len() != self.meta.content_length {
            return Err(CorruptionReason::LengthMismatch {
                expected: self.meta.content_length,
                actual: body.len(),
            });
        }

        Ok(StoredResponse {
            response: CachedResponse {
                status,
                content_type,
                body,
            },
            stored_at: self.meta.stored_at,
        })
    }

    /// Entry metadata.
    pub fn meta(&self) -> &EntryMeta {
        &self.meta
    }

    /// Size of the compressed payload.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// A decoded entry returned by a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// The replayable response.
    pub response: CachedResponse,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}
