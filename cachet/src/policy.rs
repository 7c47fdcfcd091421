//! Freshness evaluation of stored entries.

use std::time::Duration;

use cachet_backend::{Lookup, StoredResponse};
use chrono::{DateTime, Utc};

/// Default age after which an entry becomes stale.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(60);

/// Staleness policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Entries younger than this are served without side effects.
    pub freshness: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            freshness: DEFAULT_FRESHNESS,
        }
    }
}

impl PolicyConfig {
    /// Create a new builder for PolicyConfig.
    pub fn builder() -> PolicyConfigBuilder {
        PolicyConfigBuilder::default()
    }

    /// Classifies a lookup result at time `now`.
    ///
    /// Absent and corrupt entries are both a miss. Entries stamped in the future
    /// (clock skew) count as age zero.
    pub fn evaluate(&self, lookup: Lookup, now: DateTime<Utc>) -> CacheState {
        let Lookup::Found(stored) = lookup else {
            return CacheState::Miss;
        };
        let age = (now - stored.stored_at).to_std().unwrap_or(Duration::ZERO);
        if age < self.freshness {
            CacheState::Fresh(stored)
        } else {
            CacheState::Stale(stored)
        }
    }
}

/// Builder for PolicyConfig.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfigBuilder {
    config: PolicyConfig,
}

impl PolicyConfigBuilder {
    /// Set the freshness threshold.
    pub fn freshness(self, freshness: Duration) -> Self {
        Self {
            config: PolicyConfig { freshness },
        }
    }

    /// Build the PolicyConfig.
    pub fn build(self) -> PolicyConfig {
        self.config
    }
}

/// Freshness state of a lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum CacheState {
    /// Serve as-is.
    Fresh(StoredResponse),
    /// Serve, and refresh in the background.
    Stale(StoredResponse),
    /// Call the handler.
    Miss,
}

#[cfg(test)]
mod tests {
    use cachet_backend::CorruptionReason;
    use cachet_core::CachedResponse;

    use super::*;

    fn found(age: chrono::Duration, now: DateTime<Utc>) -> Lookup {
        Lookup::Found(StoredResponse {
            response: CachedResponse::ok("body"),
            stored_at: now - age,
        })
    }

    #[test]
    fn threshold_boundary() {
        let policy = PolicyConfig::default();
        let now = Utc::now();

        assert!(matches!(
            policy.evaluate(found(chrono::Duration::seconds(59), now), now),
            CacheState::Fresh(_)
        ));
        assert!(matches!(
            policy.evaluate(found(chrono::Duration::seconds(60), now), now),
            CacheState::Stale(_)
        ));
        assert!(matches!(
            policy.evaluate(found(chrono::Duration::hours(3), now), now),
            CacheState::Stale(_)
        ));
    }

    #[test]
    fn future_timestamp_is_fresh() {
        let now = Utc::now();
        let state = PolicyConfig::default().evaluate(found(chrono::Duration::seconds(-5), now), now);
        assert!(matches!(state, CacheState::Fresh(_)));
    }

    #[test]
    fn not_found_and_corrupt_are_misses() {
        let policy = PolicyConfig::builder()
            .freshness(Duration::from_secs(1))
            .build();
        let now = Utc::now();
        assert_eq!(policy.evaluate(Lookup::NotFound, now), CacheState::Miss);
        assert_eq!(
            policy.evaluate(Lookup::Corrupt(CorruptionReason::InvalidContentType), now),
            CacheState::Miss
        );
    }
}
