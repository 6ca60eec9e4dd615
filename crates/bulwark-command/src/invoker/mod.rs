//! The invoker chain.
//!
//! A call passes through three layers, outermost first:
//!
//! 1. [`CommandInvoker`]: single-invocation guard, timeout and cancellation
//!    scope, outcome classification, `CommandInvoked` event
//! 2. [`BulkheadInvoker`]: bulkhead admission and permit lifetime
//! 3. [`BreakerInvoker`]: breaker admission, timing, success and failure
//!    accounting
//!
//! The breaker layer can be switched off process-wide with
//! `useCircuitBreakers = false`, in which case the bulkhead layer runs and
//! times the work itself.

mod breaker;
mod bulkhead;
mod command;

use crate::command::Command;
use std::time::Duration;
use tokio::time::Instant;

pub use breaker::BreakerInvoker;
pub use bulkhead::{BulkheadInvoker, USE_CIRCUIT_BREAKERS_KEY};
pub use command::{CommandInvoker, CommandInvokerBuilder, InvokeOptions};

/// Times the work function and stores the result on the command.
///
/// The time is stored on [`ExecutionClock::stop`], or on drop when a timeout
/// or cancellation abandons the call, so every invocation that ran its work
/// reports an execute time.
pub(crate) struct ExecutionClock<'a, T> {
    command: &'a Command<T>,
    started: Instant,
    stopped: bool,
}

impl<'a, T> ExecutionClock<'a, T> {
    pub(crate) fn start(command: &'a Command<T>) -> Self {
        Self {
            command,
            started: Instant::now(),
            stopped: false,
        }
    }

    /// Records the elapsed time and returns it.
    pub(crate) fn stop(mut self) -> Duration {
        let elapsed = self.started.elapsed();
        self.command.set_execution_time(elapsed);
        self.stopped = true;
        elapsed
    }
}

impl<T> Drop for ExecutionClock<'_, T> {
    fn drop(&mut self) {
        if !self.stopped {
            self.command.set_execution_time(self.started.elapsed());
        }
    }
}
