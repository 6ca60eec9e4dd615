//! The bulwark invocation pipeline.
//!
//! A [`Command`] is a named, single-use unit of async work. A
//! [`CommandInvoker`] runs it through three layers:
//!
//! - a **bulkhead** that caps how many calls may run against the same
//!   resource at once, rejecting the rest immediately
//! - a **circuit breaker** that stops calling a dependency whose recent error
//!   percentage is too high, probing it with one test call at a time until it
//!   recovers
//! - a **timeout and cancellation scope** that stops the work when its time
//!   is up or the caller gives up
//!
//! Every invocation ends with exactly one [`CommandStatus`]:
//!
//! | Status | Meaning |
//! |---|---|
//! | `RanToCompletion` | the work returned `Ok` |
//! | `Faulted` | the work returned an error |
//! | `TimedOut` | the command's own timeout fired |
//! | `Canceled` | the caller's [`CancellationToken`](tokio_util::sync::CancellationToken) fired |
//! | `RejectedByBreaker` | the breaker was tripped; the work never ran |
//! | `RejectedByBulkhead` | the bulkhead was full; the work never ran |
//!
//! ## Failure modes
//!
//! [`CommandInvoker::invoke_throw`] returns failures as a [`CommandError`]
//! carrying the original error plus diagnostic context.
//! [`CommandInvoker::invoke_return`] captures them in a [`CommandResult`]
//! instead. Invoking the same command twice is a caller bug and is reported
//! as [`CommandError::AlreadyInvoked`] in both modes.
//!
//! ## Example
//!
//! ```rust
//! use bulwark_command::{Command, CommandInvoker, InvokeOptions};
//! use bulwark_core::{CommandStatus, MemoryConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = MemoryConfig::shared([
//!     ("breaker.Inventory.minimumOperations", "1"),
//!     ("breaker.Inventory.thresholdPercentage", "1"),
//!     ("metrics.Inventory.snapshotTtlMillis", "0"),
//! ]);
//! let invoker = CommandInvoker::builder(config).build();
//!
//! let failing = Command::builder("Inventory", "Reserve")
//!     .build(|_| async { Err::<u32, _>(std::io::Error::other("out of stock service down")) });
//! let result = invoker.invoke_return(&failing, InvokeOptions::new()).await.unwrap();
//! assert_eq!(result.status(), CommandStatus::Faulted);
//!
//! // One failure out of one operation trips this breaker.
//! let next = Command::builder("Inventory", "Reserve").build(|_| async { Ok::<_, std::io::Error>(7) });
//! let err = invoker.invoke_throw(&next, InvokeOptions::new()).await.unwrap_err();
//! assert_eq!(err.status(), Some(CommandStatus::RejectedByBreaker));
//! # }
//! ```
//!
//! ## Configuration
//!
//! | Key | Meaning | Default |
//! |---|---|---|
//! | `command.<name>.Timeout` | timeout in milliseconds, if positive | command default, then 2000 |
//! | `ignoreTimeouts` | disable timeouts everywhere | false |
//! | `useCircuitBreakers` | enable the breaker layer | true |
//!
//! Breaker, metrics and bulkhead keys are documented in their crates.

mod command;
mod error;
mod gauges;
mod invoker;
mod layer;
mod outcome;
mod timeout;

pub use bulwark_core::{CommandStatus, OnFailure};
pub use command::{Command, CommandBuilder};
pub use error::{CommandContext, CommandError, IsolationError};
pub use gauges::{emit_gauges, GaugeReporter, MIN_GAUGE_PERIOD};
pub use invoker::{
    BreakerInvoker, BulkheadInvoker, CommandInvoker, CommandInvokerBuilder, InvokeOptions,
    USE_CIRCUIT_BREAKERS_KEY,
};
pub use layer::{IsolatedService, IsolationLayer};
pub use outcome::CommandResult;
pub use timeout::{timeout_key, TimeoutOverride, DEFAULT_TIMEOUT, IGNORE_TIMEOUTS_KEY};
pub use tokio_util::sync::CancellationToken;
