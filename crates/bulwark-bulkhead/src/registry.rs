//! Process-wide bulkheads keyed by group, resized on configuration change.

use crate::config::{self, BULKHEAD_SECTION, MAX_CONCURRENT};
use crate::semaphore::SemaphoreBulkhead;
use bulwark_core::config::{parse_group_setting_key, DEFAULT_GROUP};
use bulwark_core::{ConfigChange, GroupKey, SharedConfig};
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Hands out one [`SemaphoreBulkhead`] per group key.
///
/// A semaphore cannot be resized, so when `bulkhead.<group>.maxConcurrent`
/// changes the registry swaps in a new bulkhead for that group. A change to
/// `bulkhead.default.maxConcurrent` swaps every group that has no capacity
/// of its own. Callers already holding a permit release it on the instance
/// they took it from; new callers see the new capacity.
pub struct BulkheadRegistry {
    config: SharedConfig,
    bulkheads: RwLock<HashMap<GroupKey, Arc<SemaphoreBulkhead>>>,
}

impl BulkheadRegistry {
    /// Creates an empty registry subscribed to `config` changes.
    pub fn new(config: SharedConfig) -> Arc<Self> {
        let registry = Arc::new(Self {
            config: Arc::clone(&config),
            bulkheads: RwLock::new(HashMap::new()),
        });

        let weak: Weak<Self> = Arc::downgrade(&registry);
        config.subscribe(Arc::new(move |change: &ConfigChange| {
            if let Some(registry) = weak.upgrade() {
                registry.on_config_change(change);
            }
        }));

        registry
    }

    /// Returns the current bulkhead for `key`, creating it on first use.
    pub fn get(&self, key: &GroupKey) -> Arc<SemaphoreBulkhead> {
        if let Some(bulkhead) = self.bulkheads.read().get(key) {
            return Arc::clone(bulkhead);
        }

        let mut bulkheads = self.bulkheads.write();
        let bulkhead = bulkheads
            .entry(key.clone())
            .or_insert_with(|| Arc::new(self.build(key)));
        Arc::clone(bulkhead)
    }

    /// Keys of every bulkhead created so far.
    pub fn groups(&self) -> Vec<GroupKey> {
        self.bulkheads.read().keys().cloned().collect()
    }

    /// The current instance of every bulkhead.
    pub fn bulkheads(&self) -> Vec<Arc<SemaphoreBulkhead>> {
        self.bulkheads.read().values().cloned().collect()
    }

    fn build(&self, key: &GroupKey) -> SemaphoreBulkhead {
        let max_concurrent = config::max_concurrent(&self.config, key);

        #[cfg(feature = "tracing")]
        tracing::debug!(bulkhead = %key, max_concurrent, "creating bulkhead");

        SemaphoreBulkhead::new(key.clone(), max_concurrent)
    }

    fn on_config_change(&self, change: &ConfigChange) {
        let Some((group, name)) = parse_group_setting_key(BULKHEAD_SECTION, &change.key) else {
            return;
        };
        if name != MAX_CONCURRENT {
            return;
        }

        let mut bulkheads = self.bulkheads.write();
        let affected: Vec<GroupKey> = if group == DEFAULT_GROUP {
            bulkheads
                .keys()
                .filter(|key| !config::has_own_capacity(&self.config, key))
                .cloned()
                .collect()
        } else {
            let key = GroupKey::named(group);
            if bulkheads.contains_key(&key) {
                vec![key]
            } else {
                Vec::new()
            }
        };

        for key in affected {
            let replacement = self.build(&key);
            let unchanged = bulkheads
                .get(&key)
                .is_some_and(|current| current.max_concurrent() == replacement.max_concurrent());
            if unchanged {
                continue;
            }

            #[cfg(feature = "tracing")]
            tracing::info!(
                bulkhead = %key,
                max_concurrent = replacement.max_concurrent(),
                "bulkhead capacity changed; replacing"
            );

            bulkheads.insert(key, Arc::new(replacement));
        }
    }
}

impl fmt::Debug for BulkheadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkheadRegistry")
            .field("bulkheads", &self.bulkheads.read().len())
            .finish()
    }
}
