//! Semaphore bulkheads for bulwark.
//!
//! A bulkhead caps how many calls may run against one resource at the same
//! time, so a slow dependency cannot absorb every worker in the process.
//! Bulkheads here never queue: when every permit is taken the call is
//! rejected on the spot.
//!
//! # Example
//!
//! ```rust
//! use bulwark_bulkhead::BulkheadRegistry;
//! use bulwark_core::{GroupKey, MemoryConfig};
//!
//! let config = MemoryConfig::shared([("bulkhead.Search.maxConcurrent", "1")]);
//! let registry = BulkheadRegistry::new(config.clone());
//! let search = GroupKey::named("Search");
//!
//! let bulkhead = registry.get(&search);
//! let permit = bulkhead.try_enter().expect("one slot free");
//! assert!(bulkhead.try_enter().is_none());
//!
//! // Raising the capacity swaps in a fresh bulkhead; the held permit still
//! // belongs to (and is released on) the old one.
//! config.set("bulkhead.Search.maxConcurrent", "4");
//! assert_eq!(registry.get(&search).available(), 4);
//! drop(permit);
//! ```
//!
//! # Configuration
//!
//! | Key | Default |
//! |---|---|
//! | `bulkhead.<group>.maxConcurrent` | `bulkhead.default.maxConcurrent`, then 10 |

mod config;
mod error;
mod registry;
mod semaphore;

pub use config::{max_concurrent, DEFAULT_MAX_CONCURRENT};
pub use error::BulkheadRejected;
pub use registry::BulkheadRegistry;
pub use semaphore::{BulkheadPermit, SemaphoreBulkhead};
