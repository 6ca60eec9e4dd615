//! Error types for the bulkhead.

use bulwark_core::GroupKey;

/// Returned when a bulkhead has no free permit.
///
/// Bulkheads never queue; a caller that finds the bulkhead full is rejected
/// immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bulkhead '{bulkhead}' is full: max concurrent calls ({max_concurrent}) reached")]
pub struct BulkheadRejected {
    /// The bulkhead that refused the call.
    pub bulkhead: GroupKey,
    /// Its capacity at the time of the rejection.
    pub max_concurrent: usize,
}
