//! Hot-reloadable key/value configuration.
//!
//! Components never own their configuration. They hold a [`SharedConfig`]
//! and read the keys they care about at the moment they need them, so a
//! changed value takes effect on the next call. Components that cache
//! something derived from configuration (the bulkhead registry caches
//! semaphores sized from `maxConcurrent`) subscribe to [`ConfigChange`]
//! notifications instead.
//!
//! Per-group settings follow one lookup order:
//!
//! 1. `<section>.<group>.<name>`
//! 2. `<section>.default.<name>`
//! 3. the hard-coded fallback supplied by the caller
//!
//! # Example
//!
//! ```
//! use bulwark_core::{ConfigSource, GroupKey, MemoryConfig};
//!
//! let config = MemoryConfig::new();
//! config.set("breaker.default.minimumOperations", "20");
//! config.set("breaker.Payments.minimumOperations", "5");
//!
//! let source: &dyn ConfigSource = &config;
//! let payments = GroupKey::named("Payments");
//! let search = GroupKey::named("Search");
//! assert_eq!(source.group_value("breaker", &payments, "minimumOperations", 10u64), 5);
//! assert_eq!(source.group_value("breaker", &search, "minimumOperations", 10u64), 20);
//! ```

use crate::error::ConfigError;
use crate::group_key::GroupKey;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Group name used for section-wide defaults.
pub const DEFAULT_GROUP: &str = "default";

/// A configuration source shared between components.
pub type SharedConfig = Arc<dyn ConfigSource>;

/// Callback invoked when a configuration value changes.
pub type ConfigListener = Arc<dyn Fn(&ConfigChange) + Send + Sync>;

/// A single key change delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    /// The key that changed.
    pub key: String,
    /// The new value, or `None` if the key was removed.
    pub value: Option<String>,
}

/// A readable, observably-changing key/value source.
///
/// Implementations must be cheap to read; the pipeline reads keys on every
/// call rather than caching them.
pub trait ConfigSource: Send + Sync {
    /// Returns the raw value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// Registers a listener to be told about every subsequent change.
    fn subscribe(&self, listener: ConfigListener);
}

impl<'a> dyn ConfigSource + 'a {
    /// Reads `key` and parses it as `T`.
    ///
    /// Values that fail to parse are treated as unset.
    pub fn value<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.trim().parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                let _err = ConfigError::Unparsable {
                    key: key.to_string(),
                    value: raw,
                    expected: std::any::type_name::<T>(),
                };
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "ignoring configuration value");
                None
            }
        }
    }

    /// Reads `key` as `T`, returning `fallback` when unset or unparsable.
    pub fn value_or<T: FromStr>(&self, key: &str, fallback: T) -> T {
        self.value(key).unwrap_or(fallback)
    }

    /// Resolves a per-group setting with the section default and `fallback`
    /// behind it.
    pub fn group_value<T: FromStr>(
        &self,
        section: &str,
        group: &GroupKey,
        name: &str,
        fallback: T,
    ) -> T {
        self.value(&group_setting_key(section, group.name(), name))
            .or_else(|| self.value(&group_setting_key(section, DEFAULT_GROUP, name)))
            .unwrap_or(fallback)
    }
}

/// Builds the key `<section>.<group>.<name>`.
pub fn group_setting_key(section: &str, group: &str, name: &str) -> String {
    format!("{section}.{group}.{name}")
}

/// Splits a `<section>.<group>.<name>` key into its group and name parts if it
/// belongs to `section`.
///
/// Group names may themselves contain dots; the setting name is always the
/// last segment.
pub fn parse_group_setting_key<'a>(section: &str, key: &'a str) -> Option<(&'a str, &'a str)> {
    let rest = key.strip_prefix(section)?.strip_prefix('.')?;
    let (group, name) = rest.rsplit_once('.')?;
    if group.is_empty() || name.is_empty() {
        return None;
    }
    Some((group, name))
}

/// In-memory [`ConfigSource`] whose values can be changed at runtime.
///
/// Suitable for tests and for applications that push configuration in from
/// their own loader.
#[derive(Default)]
pub struct MemoryConfig {
    values: RwLock<HashMap<String, String>>,
    listeners: RwLock<Vec<ConfigListener>>,
}

impl MemoryConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration pre-populated with `values`, wrapped for sharing.
    pub fn shared<I, K, V>(values: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let config = Self::new();
        {
            let mut map = config.values.write();
            for (key, value) in values {
                map.insert(key.into(), value.into());
            }
        }
        Arc::new(config)
    }

    /// Sets `key` to `value` and notifies subscribers.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.values.write().insert(key.clone(), value.clone());
        self.notify(&ConfigChange {
            key,
            value: Some(value),
        });
    }

    /// Removes `key` and notifies subscribers if it was present.
    pub fn remove(&self, key: &str) {
        let removed = self.values.write().remove(key);
        if removed.is_some() {
            self.notify(&ConfigChange {
                key: key.to_string(),
                value: None,
            });
        }
    }

    fn notify(&self, change: &ConfigChange) {
        // Listeners run outside the values lock so they can read the new value.
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(change)));
        }
    }
}

impl ConfigSource for MemoryConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn subscribe(&self, listener: ConfigListener) {
        self.listeners.write().push(listener);
    }
}

impl fmt::Debug for MemoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConfig")
            .field("values", &*self.values.read())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}
