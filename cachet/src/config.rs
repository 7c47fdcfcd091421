//! Declarative cache configuration.
//!
//! [`CacheSettings`] mirrors the programmatic builders and can be loaded from
//! YAML:
//!
//! ```yaml
//! capacity: 1024
//! freshness: 1m
//! compression:
//!   type: Gzip
//!   level: 6
//! refresh:
//!   timeout: 30s
//!   max_concurrent: 16
//! routes:
//!   /api/stats: { type: Disabled }
//!   /api/search: { type: IgnoreParams, params: [trace_id] }
//! ```
//!
//! Every field is optional and defaults to the values above.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cachet_backend::{Compressor, GzipCompressor, LruStore, PassthroughCompressor};
use cachet_core::{IgnoreParams, Strategy, StrategyRegistry};
use serde::{Deserialize, Serialize};

use crate::cache::{Cache, CacheBuilder};
use crate::error::ConfigError;
use crate::policy::{DEFAULT_FRESHNESS, PolicyConfig};
use crate::refresh::{DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT, RefreshConfig, TimeoutPolicy};

/// Top-level cache settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of stored entries.
    pub capacity: usize,
    /// Age after which an entry is stale (e.g., "30s", "1m").
    #[serde(with = "humantime_serde")]
    pub freshness: Duration,
    /// Payload codec.
    pub compression: Compression,
    /// Background refresh settings.
    pub refresh: RefreshSettings,
    /// Per-route strategies, keyed by exact path.
    pub routes: BTreeMap<String, RouteStrategy>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: cachet_backend::DEFAULT_CAPACITY,
            freshness: DEFAULT_FRESHNESS,
            compression: Compression::default(),
            refresh: RefreshSettings::default(),
            routes: BTreeMap::new(),
        }
    }
}

impl CacheSettings {
    /// Parses and validates settings from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_saphyr::from_str(yaml).map_err(|error| ConfigError::Parse(error.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the cache cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capacity",
                reason: "must be greater than zero",
            });
        }
        if self.refresh.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh.max_concurrent",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// The staleness policy these settings describe.
    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig::builder().freshness(self.freshness).build()
    }

    /// The refresh pool configuration these settings describe.
    pub fn refresh_config(&self) -> RefreshConfig {
        let timeout_policy = match self.refresh.timeout {
            Some(timeout) => TimeoutPolicy::Cancel(timeout),
            None => TimeoutPolicy::None,
        };
        RefreshConfig::builder()
            .max_concurrent(self.refresh.max_concurrent)
            .timeout_policy(timeout_policy)
            .build()
    }

    /// Builds a registry holding the configured routes.
    pub fn registry(&self) -> StrategyRegistry {
        let registry = StrategyRegistry::new();
        for (path, route) in &self.routes {
            registry.register_strategy(path.as_str(), route.to_strategy());
        }
        registry
    }
}

/// Background refresh settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RefreshSettings {
    /// Deadline after which a refresh is cancelled; `null` disables it.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Maximum number of refreshes running at once.
    pub max_concurrent: usize,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Payload compression.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Compression {
    /// Store payloads uncompressed.
    Disabled,
    /// Gzip with the given level.
    Gzip {
        /// Compression level, 0-9.
        #[serde(default = "default_gzip_level")]
        level: u32,
    },
    /// Zstandard with the given level (requires the `zstd` feature).
    Zstd {
        /// Compression level.
        #[serde(default = "default_zstd_level")]
        level: i32,
    },
}

fn default_gzip_level() -> u32 {
    GzipCompressor::DEFAULT_LEVEL
}

fn default_zstd_level() -> i32 {
    3
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Gzip {
            level: default_gzip_level(),
        }
    }
}

impl Compression {
    /// Convert configuration compression format to a store compressor.
    pub fn to_compressor(&self) -> Result<Arc<dyn Compressor>, ConfigError> {
        match self {
            Compression::Disabled => Ok(Arc::new(PassthroughCompressor)),
            Compression::Gzip { level } => Ok(Arc::new(GzipCompressor::new(*level))),
            #[cfg(feature = "zstd")]
            Compression::Zstd { level } => {
                Ok(Arc::new(cachet_backend::ZstdCompressor::new(*level)))
            }
            #[cfg(not(feature = "zstd"))]
            Compression::Zstd { .. } => Err(ConfigError::CompressionUnavailable("zstd")),
        }
    }
}

/// Strategy of a configured route.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RouteStrategy {
    /// The default fingerprint algorithm.
    Default,
    /// Never cache the route.
    Disabled,
    /// The default algorithm, additionally ignoring `params`.
    IgnoreParams {
        /// Parameters to leave out of the fingerprint.
        params: Vec<String>,
    },
}

impl RouteStrategy {
    /// Converts the configured route into a registry strategy.
    pub fn to_strategy(&self) -> Strategy {
        match self {
            RouteStrategy::Default => Strategy::Default,
            RouteStrategy::Disabled => Strategy::NoCache,
            RouteStrategy::IgnoreParams { params } => {
                Strategy::custom(IgnoreParams::new(params.iter().cloned()))
            }
        }
    }
}

impl Cache<LruStore> {
    /// Builds a cache from validated settings.
    pub fn from_settings(settings: &CacheSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let store = LruStore::builder()
            .capacity(settings.capacity)
            .shared_compressor(settings.compression.to_compressor()?)
            .build();
        Ok(CacheBuilder::new(store)
            .registry(Arc::new(settings.registry()))
            .policy(settings.policy())
            .refresh(settings.refresh_config())
            .build())
    }
}
