//! Route path to strategy mapping.

use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;

use crate::{KeyStrategy, Strategy};

/// Concurrent mapping from exact route paths to their [`Strategy`].
///
/// Routes without an entry use [`Strategy::Default`]. Lookups are lock-free for
/// readers on different shards, so the registry can be consulted on every
/// request while routes are still being registered.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    routes: DashMap<SmolStr, Strategy>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the key strategy for `path`.
    ///
    /// `None` registers [`Strategy::NoCache`]. A later registration for the same
    /// path replaces the earlier one.
    pub fn register(&self, path: impl Into<SmolStr>, strategy: Option<Arc<dyn KeyStrategy>>) {
        let strategy = match strategy {
            Some(strategy) => Strategy::Custom(strategy),
            None => Strategy::NoCache,
        };
        self.register_strategy(path, strategy);
    }

    /// Registers `strategy` for `path`, returning the replaced strategy.
    pub fn register_strategy(
        &self,
        path: impl Into<SmolStr>,
        strategy: Strategy,
    ) -> Option<Strategy> {
        let path = path.into();
        tracing::debug!(path = %path, ?strategy, "Registering route strategy");
        self.routes.insert(path, strategy)
    }

    /// Disables caching for `path`.
    pub fn disable(&self, path: impl Into<SmolStr>) {
        self.register_strategy(path, Strategy::NoCache);
    }

    /// Removes the entry for `path`, so it falls back to the default strategy.
    pub fn unregister(&self, path: &str) -> Option<Strategy> {
        self.routes.remove(path).map(|(_, strategy)| strategy)
    }

    /// Returns the strategy for `path`.
    pub fn resolve(&self, path: &str) -> Strategy {
        self.routes
            .get(path)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of explicitly registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
