//! Refresh pool configuration.

use std::time::Duration;

/// Default number of refreshes that may run at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Default refresh deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Policy for handling refresh timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// No timeout - the refresh runs until completion.
    None,
    /// Cancel the refresh after the duration, releasing its token.
    Cancel(Duration),
    /// Log a warning after the duration but let the refresh continue.
    Warn(Duration),
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy::Cancel(DEFAULT_TIMEOUT)
    }
}

/// Configuration for the [`RefreshPool`](super::RefreshPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Maximum number of refreshes running at once.
    pub max_concurrent: usize,
    /// Timeout policy for refresh tasks.
    pub timeout_policy: TimeoutPolicy,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

impl RefreshConfig {
    /// Create a new builder for RefreshConfig.
    pub fn builder() -> RefreshConfigBuilder {
        RefreshConfigBuilder::default()
    }
}

/// Builder for RefreshConfig.
#[derive(Debug, Clone, Default)]
pub struct RefreshConfigBuilder {
    config: RefreshConfig,
}

impl RefreshConfigBuilder {
    /// Set the maximum number of concurrent refreshes.
    pub fn max_concurrent(self, max: usize) -> Self {
        Self {
            config: RefreshConfig {
                max_concurrent: max,
                ..self.config
            },
        }
    }

    /// Set timeout policy.
    pub fn timeout_policy(self, policy: TimeoutPolicy) -> Self {
        Self {
            config: RefreshConfig {
                timeout_policy: policy,
                ..self.config
            },
        }
    }

    /// Set timeout with cancel policy.
    pub fn timeout(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Cancel(duration))
    }

    /// Build the RefreshConfig.
    pub fn build(self) -> RefreshConfig {
        self.config
    }
}
