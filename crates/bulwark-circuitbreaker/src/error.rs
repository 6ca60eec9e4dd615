use bulwark_core::GroupKey;
use thiserror::Error;

/// Returned when a tripped breaker refuses a call.
///
/// The protected work never ran, so a rejection is never counted in the
/// breaker's own metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{breaker}' is tripped; call not permitted")]
pub struct BreakerRejected {
    /// The breaker that refused the call.
    pub breaker: GroupKey,
}

impl BreakerRejected {
    /// Creates the rejection for `breaker`.
    pub fn new(breaker: GroupKey) -> Self {
        Self { breaker }
    }
}
