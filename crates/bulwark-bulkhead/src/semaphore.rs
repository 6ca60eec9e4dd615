//! Non-blocking counting semaphore bulkhead.

use bulwark_core::GroupKey;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps the number of calls running concurrently against a resource.
///
/// Admission is all-or-nothing: [`try_enter`](Self::try_enter) either hands
/// out a permit immediately or returns `None`. Nobody waits.
pub struct SemaphoreBulkhead {
    key: GroupKey,
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
}

impl SemaphoreBulkhead {
    /// Creates a bulkhead admitting at most `max_concurrent` calls.
    ///
    /// A capacity of zero rejects every call.
    pub fn new(key: GroupKey, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.min(Semaphore::MAX_PERMITS);
        Self {
            key,
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// The bulkhead's group key.
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// The capacity this instance was built with.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent.saturating_sub(self.available())
    }

    /// Takes a permit if one is free.
    ///
    /// The permit is returned to this instance when dropped, even if the
    /// registry has since replaced the bulkhead with a resized one.
    pub fn try_enter(&self) -> Option<BulkheadPermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Some(BulkheadPermit {
                bulkhead: self.key.clone(),
                _permit: permit,
            }),
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(bulkhead = %self.key, max_concurrent = self.max_concurrent, "bulkhead full");
                None
            }
        }
    }
}

impl fmt::Debug for SemaphoreBulkhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemaphoreBulkhead")
            .field("key", &self.key)
            .field("max_concurrent", &self.max_concurrent)
            .field("available", &self.available())
            .finish()
    }
}

/// A held bulkhead slot. Dropping it releases the slot.
#[must_use = "the bulkhead slot is released as soon as the permit is dropped"]
pub struct BulkheadPermit {
    bulkhead: GroupKey,
    _permit: OwnedSemaphorePermit,
}

impl BulkheadPermit {
    /// The bulkhead this permit was taken from.
    pub fn bulkhead(&self) -> &GroupKey {
        &self.bulkhead
    }

    /// Releases the slot now.
    pub fn release(self) {}
}

impl fmt::Debug for BulkheadPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkheadPermit")
            .field("bulkhead", &self.bulkhead)
            .finish()
    }
}
