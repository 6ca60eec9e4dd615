//! Failure-percentage circuit breaker for bulwark.
//!
//! A circuit breaker stops calls to a dependency that is failing too often,
//! giving it time to recover instead of piling more load onto it.
//!
//! ## Pieces
//!
//! - [`CommandMetrics`]: a rolling window of success and failure counts,
//!   with a briefly cached [`MetricsSnapshot`]
//! - [`FailurePercentageBreaker`]: trips when the window's error percentage
//!   reaches a threshold, then lets one test call through per tripped
//!   duration until one succeeds
//! - [`BreakerRegistry`]: one breaker and one metrics window per
//!   [`GroupKey`](bulwark_core::GroupKey), created on first use
//! - [`IgnoredErrors`]: error types that count as successes
//!
//! ## Usage
//!
//! ```rust
//! use bulwark_circuitbreaker::BreakerRegistry;
//! use bulwark_core::{EventListeners, GroupKey, MemoryConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = MemoryConfig::shared([
//!     ("breaker.default.minimumOperations", "2"),
//!     ("metrics.default.snapshotTtlMillis", "0"),
//! ]);
//! let registry = BreakerRegistry::new(config, Arc::new(EventListeners::new()));
//!
//! let breaker = registry.get(&GroupKey::named("Payments"));
//! assert!(breaker.is_allowing());
//!
//! breaker.metrics().mark_failure();
//! breaker.metrics().mark_failure();
//! assert!(!breaker.is_allowing());
//!
//! // A success that started before the trip does not fix the breaker.
//! breaker.mark_success(Duration::from_secs(60));
//! assert!(breaker.is_tripped());
//! # }
//! ```
//!
//! ## Configuration
//!
//! Every property is read from the shared
//! [`ConfigSource`](bulwark_core::ConfigSource) on use, so changes apply to
//! the next call. See [`BreakerProperties`] and [`MetricsProperties`] for the
//! keys.
//!
//! ## Feature flags
//!
//! - `tracing`: log trips, fixes and test admissions
//! - `serde`: serialize [`BreakerState`] and [`MetricsSnapshot`]

mod breaker;
pub mod classifier;
mod config;
mod error;
mod metrics;
mod registry;

pub use breaker::{BreakerState, FailurePercentageBreaker};
pub use classifier::IgnoredErrors;
pub use config::{
    BreakerProperties, MetricsProperties, DEFAULT_MINIMUM_OPERATIONS, DEFAULT_SNAPSHOT_TTL_MILLIS,
    DEFAULT_THRESHOLD_PERCENTAGE, DEFAULT_TRIPPED_DURATION_MILLIS, DEFAULT_WINDOW_MILLIS,
};
pub use error::BreakerRejected;
pub use metrics::{CommandMetrics, MetricsSnapshot};
pub use registry::BreakerRegistry;
