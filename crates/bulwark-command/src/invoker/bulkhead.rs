use super::breaker::BreakerInvoker;
use super::ExecutionClock;
use crate::command::{Command, Work};
use crate::error::IsolationError;
use bulwark_bulkhead::{BulkheadPermit, BulkheadRegistry, BulkheadRejected};
use bulwark_core::{EventSink, GroupKey, IsolationEvent, SharedConfig};
use std::sync::Arc;
use std::time::Instant as StdInstant;
use tokio_util::sync::CancellationToken;

/// Configuration key of the process-wide breaker switch.
pub const USE_CIRCUIT_BREAKERS_KEY: &str = "useCircuitBreakers";

/// Admits work through its bulkhead, then hands it to the breaker layer.
#[derive(Clone)]
pub struct BulkheadInvoker {
    bulkheads: Arc<BulkheadRegistry>,
    breaker: BreakerInvoker,
    config: SharedConfig,
    events: EventSink,
}

impl BulkheadInvoker {
    /// Creates an invoker over `bulkheads` that delegates to `breaker`.
    pub fn new(
        bulkheads: Arc<BulkheadRegistry>,
        breaker: BreakerInvoker,
        config: SharedConfig,
        events: EventSink,
    ) -> Self {
        Self {
            bulkheads,
            breaker,
            config,
            events,
        }
    }

    /// The registry bulkheads are resolved from.
    pub fn bulkheads(&self) -> &Arc<BulkheadRegistry> {
        &self.bulkheads
    }

    /// The breaker layer this invoker delegates to.
    pub fn breaker(&self) -> &BreakerInvoker {
        &self.breaker
    }

    /// Whether the breaker layer is currently enabled.
    pub fn use_circuit_breakers(&self) -> bool {
        self.config.value_or(USE_CIRCUIT_BREAKERS_KEY, true)
    }

    /// Runs `work` for `command` if its bulkhead has a free slot.
    pub(crate) async fn invoke<T>(
        &self,
        command: &Command<T>,
        work: Work<T>,
        token: CancellationToken,
    ) -> Result<T, IsolationError> {
        // Resolved once: the permit goes back to this instance even if the
        // registry swaps in a resized bulkhead while the work runs.
        let bulkhead = self.bulkheads.get(command.bulkhead_key());

        let Some(permit) = bulkhead.try_enter() else {
            tracing::debug!(
                command = %command.name(),
                bulkhead = %bulkhead.key(),
                max_concurrent = bulkhead.max_concurrent(),
                "rejected by bulkhead"
            );

            self.events.emit(&IsolationEvent::RejectedByBulkhead {
                bulkhead: bulkhead.key().clone(),
                command: command.shared_name(),
                timestamp: StdInstant::now(),
            });
            return Err(BulkheadRejected {
                bulkhead: bulkhead.key().clone(),
                max_concurrent: bulkhead.max_concurrent(),
            }
            .into());
        };

        tracing::trace!(command = %command.name(), bulkhead = %bulkhead.key(), "entered bulkhead");
        self.events.emit(&IsolationEvent::EnterBulkhead {
            bulkhead: bulkhead.key().clone(),
            command: command.shared_name(),
            timestamp: StdInstant::now(),
        });

        let _lease = Lease {
            permit: Some(permit),
            bulkhead: bulkhead.key().clone(),
            command: command.shared_name(),
            events: &self.events,
        };

        if self.use_circuit_breakers() {
            return self.breaker.invoke(command, work, token).await;
        }

        let clock = ExecutionClock::start(command);
        let result = work(token).await;
        clock.stop();
        result.map_err(IsolationError::Faulted)
    }
}

/// Holds the permit for the duration of the call and reports the exit,
/// however the call ends.
struct Lease<'a> {
    permit: Option<BulkheadPermit>,
    bulkhead: GroupKey,
    command: Arc<str>,
    events: &'a EventSink,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        drop(self.permit.take());
        tracing::trace!(command = %self.command, bulkhead = %self.bulkhead, "left bulkhead");
        self.events.emit(&IsolationEvent::LeaveBulkhead {
            bulkhead: self.bulkhead.clone(),
            command: Arc::clone(&self.command),
            timestamp: StdInstant::now(),
        });
    }
}

impl std::fmt::Debug for BulkheadInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkheadInvoker")
            .field("bulkheads", &self.bulkheads)
            .field("breaker", &self.breaker)
            .finish()
    }
}
