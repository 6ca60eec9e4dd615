use super::ExecutionClock;
use crate::command::{Command, Work};
use crate::error::IsolationError;
use bulwark_circuitbreaker::{
    BreakerRegistry, BreakerRejected, FailurePercentageBreaker, IgnoredErrors,
};
use bulwark_core::{EventSink, IsolationEvent};
use std::sync::Arc;
use std::time::Instant as StdInstant;
use tokio_util::sync::CancellationToken;

/// Gates work on its breaker and reports the outcome back to it.
///
/// Errors whose type is in the [`IgnoredErrors`] set are counted as
/// successes but still returned to the caller.
#[derive(Clone)]
pub struct BreakerInvoker {
    breakers: Arc<BreakerRegistry>,
    ignored: IgnoredErrors,
    events: EventSink,
}

impl BreakerInvoker {
    /// Creates an invoker over `breakers`.
    pub fn new(breakers: Arc<BreakerRegistry>, ignored: IgnoredErrors, events: EventSink) -> Self {
        Self {
            breakers,
            ignored,
            events,
        }
    }

    /// The registry breakers are resolved from.
    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    /// Runs `work` for `command` if the breaker allows it.
    pub(crate) async fn invoke<T>(
        &self,
        command: &Command<T>,
        work: Work<T>,
        token: CancellationToken,
    ) -> Result<T, IsolationError> {
        let breaker = self.breakers.get(command.breaker_key());

        if !breaker.is_allowing() {
            tracing::debug!(
                command = %command.name(),
                breaker = %breaker.key(),
                "rejected by circuit breaker"
            );

            self.events.emit(&IsolationEvent::RejectedByBreaker {
                breaker: breaker.key().clone(),
                command: command.shared_name(),
                timestamp: StdInstant::now(),
            });
            return Err(BreakerRejected::new(breaker.key().clone()).into());
        }

        // Counts the call as a failure if it is dropped mid-flight, which is
        // how timeouts and caller cancellation reach this layer.
        let mut abandoned = AbandonedCall {
            breaker: &breaker,
            command,
            events: &self.events,
            armed: true,
        };

        let clock = ExecutionClock::start(command);
        let result = work(token).await;
        let elapsed = clock.stop();
        abandoned.armed = false;

        match result {
            Ok(value) => {
                self.record_success(&breaker, command, elapsed);
                Ok(value)
            }
            Err(err) if self.ignored.is_ignored(&*err) => {
                self.record_success(&breaker, command, elapsed);
                Err(IsolationError::Faulted(err))
            }
            Err(err) => {
                record_failure(&breaker, command, &self.events);
                Err(IsolationError::Faulted(err))
            }
        }
    }

    fn record_success<T>(
        &self,
        breaker: &FailurePercentageBreaker,
        command: &Command<T>,
        elapsed: std::time::Duration,
    ) {
        breaker.mark_success(elapsed);
        breaker.metrics().mark_success();
        self.events.emit(&IsolationEvent::BreakerSuccessCount {
            breaker: breaker.key().clone(),
            command: command.shared_name(),
            timestamp: StdInstant::now(),
        });
    }
}

fn record_failure<T>(breaker: &FailurePercentageBreaker, command: &Command<T>, events: &EventSink) {
    breaker.metrics().mark_failure();
    events.emit(&IsolationEvent::BreakerFailureCount {
        breaker: breaker.key().clone(),
        command: command.shared_name(),
        timestamp: StdInstant::now(),
    });
}

struct AbandonedCall<'a, T> {
    breaker: &'a FailurePercentageBreaker,
    command: &'a Command<T>,
    events: &'a EventSink,
    armed: bool,
}

impl<T> Drop for AbandonedCall<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            record_failure(self.breaker, self.command, self.events);
        }
    }
}

impl std::fmt::Debug for BreakerInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerInvoker")
            .field("breakers", &self.breakers)
            .field("ignored", &self.ignored)
            .finish()
    }
}
