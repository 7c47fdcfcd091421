//! Payload compression.
//!
//! Entries are compressed on write and decompressed on read. The store is
//! agnostic of the codec: anything implementing [`Compressor`] can be plugged in.
//!
//! - [`PassthroughCompressor`] stores payloads as-is
//! - [`GzipCompressor`] uses `flate2` (the default)
//! - `ZstdCompressor` uses `zstd` (requires the `zstd` feature)

use std::fmt::Debug;
use std::io::{self, Read, Write};

use bytes::Bytes;
use thiserror::Error;

/// Error raised by a [`Compressor`].
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Compressing a payload failed.
    #[error("compression failed: {0}")]
    Compress(#[source] io::Error),
    /// The stored payload could not be decompressed.
    #[error("decompression failed: {0}")]
    Decompress(#[source] io::Error),
}

/// Codec used for entry payloads.
pub trait Compressor: Send + Sync + Debug {
    /// Compresses `data`.
    fn compress(&self, data: &[u8]) -> Result<Bytes, CompressionError>;

    /// Restores data produced by [`compress`](Compressor::compress).
    fn decompress(&self, data: &[u8]) -> Result<Bytes, CompressionError>;

    /// Short codec name used in logs.
    fn name(&self) -> &'static str;
}

/// Stores payloads without compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompressor;

impl Compressor for PassthroughCompressor {
    fn compress(&self, data: &[u8]) -> Result<Bytes, CompressionError> {
        Ok(Bytes::copy_from_slice(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Bytes, CompressionError> {
        Ok(Bytes::copy_from_slice(data))
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Gzip codec.
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: u32,
}

impl GzipCompressor {
    /// Default compression level.
    pub const DEFAULT_LEVEL: u32 = 6;

    /// Creates a gzip codec with the given level, clamped to `0..=9`.
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    /// Configured compression level.
    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL)
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Bytes, CompressionError> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::new(self.level));
        encoder.write_all(data).map_err(CompressionError::Compress)?;
        encoder
            .finish()
            .map(Bytes::from)
            .map_err(CompressionError::Compress)
    }

    fn decompress(&self, data: &[u8]) -> Result<Bytes, CompressionError> {
        let mut decoder = flate2::read::GzDecoder::new(data);
        let mut out = Vec::with_capacity(data.len() * 2);
        decoder
            .read_to_end(&mut out)
            .map_err(CompressionError::Decompress)?;
        Ok(Bytes::from(out))
    }

    fn name(&self) -> &'static str {
        "gzip"
    }
}

/// Zstandard codec.
#[cfg(feature = "zstd")]
#[derive(Debug, Clone, Copy)]
pub struct ZstdCompressor {
    level: i32,
}

#[cfg(feature = "zstd")]
impl ZstdCompressor {
    /// Default compression level.
    pub const DEFAULT_LEVEL: i32 = 3;

    /// Creates a zstd codec with the given level.
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

#[cfg(feature = "zstd")]
impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL)
    }
}

#[cfg(feature = "zstd")]
impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Bytes, CompressionError> {
        zstd::stream::encode_all(data, self.level)
            .map(Bytes::from)
            .map_err(CompressionError::Compress)
    }

    fn decompress(&self, data: &[u8]) -> Result<Bytes, CompressionError> {
        zstd::stream::decode_all(data)
            .map(Bytes::from)
            .map_err(CompressionError::Decompress)
    }

    fn name(&self) -> &'static str {
        "zstd"
    }
}
