//! Interned names for isolation domains.

use hashbrown::HashSet;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, OnceLock};

static INTERNED: OnceLock<Mutex<HashSet<Arc<str>>>> = OnceLock::new();

/// The logical name of an isolation domain, e.g. `"PaymentsApi"`.
///
/// Breakers, metrics and bulkheads are all looked up by group key. Names are
/// case-sensitive and interned, so every key built from the same name shares
/// one allocation and clones are a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(Arc<str>);

impl GroupKey {
    /// Returns the key for `name`, interning it on first use.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_core::GroupKey;
    ///
    /// let a = GroupKey::named("PaymentsApi");
    /// let b = GroupKey::named("PaymentsApi");
    /// assert_eq!(a, b);
    /// assert_ne!(a, GroupKey::named("paymentsapi"));
    /// ```
    pub fn named(name: &str) -> Self {
        let mut interned = INTERNED.get_or_init(Default::default).lock();
        if let Some(existing) = interned.get(name) {
            return GroupKey(Arc::clone(existing));
        }
        let key: Arc<str> = Arc::from(name);
        interned.insert(Arc::clone(&key));
        GroupKey(key)
    }

    /// Returns the name this key was created from.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns `true` if both keys point at the same interned name.
    pub fn ptr_eq(&self, other: &GroupKey) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GroupKey").field(&self.name()).finish()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for GroupKey {
    fn from(name: &str) -> Self {
        GroupKey::named(name)
    }
}

impl From<String> for GroupKey {
    fn from(name: String) -> Self {
        GroupKey::named(&name)
    }
}

impl AsRef<str> for GroupKey {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl Borrow<str> for GroupKey {
    fn borrow(&self) -> &str {
        self.name()
    }
}
