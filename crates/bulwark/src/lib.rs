//! Call isolation for async Rust services.
//!
//! `bulwark` runs calls to remote dependencies as *commands* that pass through
//! three guards, in order:
//!
//! 1. **Bulkhead** (`bulkhead` feature): a per-group semaphore that rejects
//!    calls instead of queueing them once the group's concurrency is used up
//! 2. **Circuit breaker** (`circuitbreaker` feature): trips when the recent
//!    error percentage of a group crosses its threshold, then lets a single
//!    test call through after a cool-down
//! 3. **Timeout** (`command` feature): abandons calls that run too long and
//!    signals cancellation to the work through a [`CancellationToken`]
//!
//! Every setting is read from a hot-reloadable [`core::ConfigSource`], and
//! every decision is reported as a [`core::IsolationEvent`].
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! bulwark = { version = "0.1", features = ["full"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! use bulwark::command::{Command, CommandInvoker, CommandStatus, InvokeOptions};
//! use bulwark::core::MemoryConfig;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = MemoryConfig::shared([
//!     ("bulkhead.Inventory.maxConcurrent", "4"),
//!     ("breaker.Inventory.thresholdPercentage", "25"),
//!     ("command.Inventory.Reserve.Timeout", "500"),
//! ]);
//! let invoker = CommandInvoker::builder(config).build();
//!
//! let reserve = Command::builder("Inventory", "Reserve")
//!     .build(|_token| async { Ok::<_, std::io::Error>(3_u32) });
//!
//! let result = invoker
//!     .invoke_return(&reserve, InvokeOptions::new())
//!     .await
//!     .unwrap();
//! assert_eq!(result.status(), CommandStatus::RanToCompletion);
//! assert_eq!(result.value(), Some(&3));
//! # }
//! ```
//!
//! # Individual Crates
//!
//! Each component is also available as a standalone crate:
//!
//! - `bulwark-core` (group keys, configuration, events)
//! - `bulwark-circuitbreaker`
//! - `bulwark-bulkhead`
//! - `bulwark-command`
//!
//! [`CancellationToken`]: https://docs.rs/tokio-util/latest/tokio_util/sync/struct.CancellationToken.html

// Re-export core (always available)
pub use bulwark_core as core;

#[cfg(feature = "circuitbreaker")]
pub use bulwark_circuitbreaker as circuitbreaker;

#[cfg(feature = "bulkhead")]
pub use bulwark_bulkhead as bulkhead;

#[cfg(feature = "command")]
pub use bulwark_command as command;

/// The types most applications need.
pub mod prelude {
    pub use bulwark_core::{
        CommandStatus, ConfigSource, GroupKey, IsolationEvent, MemoryConfig, OnFailure,
        SharedConfig,
    };

    #[cfg(feature = "command")]
    pub use bulwark_command::{
        CancellationToken, Command, CommandError, CommandInvoker, CommandResult, InvokeOptions,
        IsolationLayer,
    };
}
