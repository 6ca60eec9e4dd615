//! Lazily created, process-wide breakers keyed by group.

use crate::breaker::FailurePercentageBreaker;
use crate::metrics::CommandMetrics;
use bulwark_core::{EventSink, GroupKey, SharedConfig};
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Hands out one breaker (and its metrics) per group key.
///
/// The first request for a key creates the breaker and a fresh
/// [`CommandMetrics`] for it; every later request, from any thread, gets the
/// same pair. Breakers read their properties live, so configuration changes
/// never require replacing one.
pub struct BreakerRegistry {
    config: SharedConfig,
    events: EventSink,
    breakers: RwLock<HashMap<GroupKey, Arc<FailurePercentageBreaker>>>,
}

impl BreakerRegistry {
    /// Creates an empty registry.
    pub fn new(config: SharedConfig, events: EventSink) -> Self {
        Self {
            config,
            events,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the breaker for `key`, creating it on first use.
    pub fn get(&self, key: &GroupKey) -> Arc<FailurePercentageBreaker> {
        if let Some(breaker) = self.breakers.read().get(key) {
            return Arc::clone(breaker);
        }

        let mut breakers = self.breakers.write();
        let breaker = breakers.entry(key.clone()).or_insert_with(|| {
            #[cfg(feature = "tracing")]
            tracing::debug!(breaker = %key, "creating circuit breaker");

            let metrics = Arc::new(CommandMetrics::new(key.clone(), Arc::clone(&self.config)));
            Arc::new(FailurePercentageBreaker::new(
                key.clone(),
                metrics,
                Arc::clone(&self.config),
                Arc::clone(&self.events),
            ))
        });
        Arc::clone(breaker)
    }

    /// Returns the metrics paired with the breaker for `key`.
    pub fn metrics(&self, key: &GroupKey) -> Arc<CommandMetrics> {
        Arc::clone(self.get(key).metrics())
    }

    /// Returns the breaker for `key` only if it already exists.
    pub fn existing(&self, key: &GroupKey) -> Option<Arc<FailurePercentageBreaker>> {
        self.breakers.read().get(key).cloned()
    }

    /// Keys of every breaker created so far.
    pub fn groups(&self) -> Vec<GroupKey> {
        self.breakers.read().keys().cloned().collect()
    }

    /// Every breaker created so far.
    pub fn breakers(&self) -> Vec<Arc<FailurePercentageBreaker>> {
        self.breakers.read().values().cloned().collect()
    }

    /// The configuration breakers are created with.
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }
}

impl fmt::Debug for BreakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerRegistry")
            .field("breakers", &self.breakers.read().len())
            .finish()
    }
}
