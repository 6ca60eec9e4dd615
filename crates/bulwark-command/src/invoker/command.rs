use super::breaker::BreakerInvoker;
use super::bulkhead::BulkheadInvoker;
use crate::command::{Command, Work};
use crate::error::{CommandContext, CommandError, IsolationError};
use crate::outcome::CommandResult;
use crate::timeout::{effective_timeout, TimeoutOverride};
use bulwark_bulkhead::BulkheadRegistry;
use bulwark_circuitbreaker::{BreakerRegistry, IgnoredErrors};
use bulwark_core::{
    BoxError, CommandStatus, EventListener, EventListeners, EventSink, IsolationEvent, OnFailure,
    SharedConfig,
};
use futures::FutureExt;
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-invocation settings.
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    timeout: TimeoutOverride,
    cancellation: Option<CancellationToken>,
}

impl InvokeOptions {
    /// Options that inherit every setting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `timeout` for this invocation, ignoring configuration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = TimeoutOverride::Fixed(timeout);
        self
    }

    /// Runs this invocation without a timeout.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = TimeoutOverride::Disabled;
        self
    }

    /// Cancels the invocation when `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Top of the invoker chain.
///
/// Cloning is cheap; clones share registries, configuration and the event
/// sink.
///
/// # Example
///
/// ```rust
/// use bulwark_command::{Command, CommandInvoker, InvokeOptions};
/// use bulwark_core::{CommandStatus, MemoryConfig};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let invoker = CommandInvoker::builder(MemoryConfig::shared([
///     ("bulkhead.default.maxConcurrent", "4"),
/// ]))
/// .build();
///
/// let command = Command::builder("Users", "Fetch")
///     .build(|_token| async { Ok::<_, std::io::Error>("alice") });
/// let user = invoker.invoke_throw(&command, InvokeOptions::new()).await.unwrap();
/// assert_eq!(user, "alice");
///
/// let slow = Command::builder("Users", "Slow").build(|_token| async {
///     tokio::time::sleep(Duration::from_secs(10)).await;
///     Ok::<_, std::io::Error>("bob")
/// });
/// let result = invoker
///     .invoke_return(&slow, InvokeOptions::new().timeout(Duration::from_millis(10)))
///     .await
///     .unwrap();
/// assert_eq!(result.status(), CommandStatus::TimedOut);
/// # }
/// ```
#[derive(Clone)]
pub struct CommandInvoker {
    bulkhead: BulkheadInvoker,
    config: SharedConfig,
    events: EventSink,
}

impl CommandInvoker {
    /// Starts building an invoker reading `config`.
    pub fn builder(config: SharedConfig) -> CommandInvokerBuilder {
        CommandInvokerBuilder::new(config)
    }

    /// Assembles an invoker from an existing bulkhead layer.
    pub fn new(bulkhead: BulkheadInvoker, config: SharedConfig, events: EventSink) -> Self {
        Self {
            bulkhead,
            config,
            events,
        }
    }

    /// The breaker registry behind this invoker.
    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        self.bulkhead.breaker().breakers()
    }

    /// The bulkhead registry behind this invoker.
    pub fn bulkheads(&self) -> &Arc<BulkheadRegistry> {
        self.bulkhead.bulkheads()
    }

    /// The shared configuration.
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// The event sink every layer reports to.
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Invokes `command`, returning any failure as an error.
    pub async fn invoke_throw<T>(
        &self,
        command: &Command<T>,
        options: InvokeOptions,
    ) -> Result<T, CommandError> {
        self.execute(command, options, OnFailure::Throw)
            .await?
            .into_result()
    }

    /// Invokes `command`, capturing any failure in the returned
    /// [`CommandResult`].
    ///
    /// The outer error is only ever [`CommandError::AlreadyInvoked`].
    pub async fn invoke_return<T>(
        &self,
        command: &Command<T>,
        options: InvokeOptions,
    ) -> Result<CommandResult<T>, CommandError> {
        self.execute(command, options, OnFailure::Return).await
    }

    /// Runs `command` on the tokio runtime without waiting for it.
    ///
    /// The pipeline runs in full and reports its events as usual. Failures
    /// are logged and otherwise dropped.
    pub fn invoke_detached<T>(&self, command: Command<T>, options: InvokeOptions) -> JoinHandle<()>
    where
        T: Send + 'static,
    {
        let invoker = self.clone();
        tokio::spawn(async move {
            let outcome = invoker
                .execute(&command, options, OnFailure::Return)
                .await
                .and_then(CommandResult::into_result);
            if let Err(error) = outcome {
                tracing::warn!(command = %command.name(), %error, "detached command failed");
            }
        })
    }

    async fn execute<T>(
        &self,
        command: &Command<T>,
        options: InvokeOptions,
        on_failure: OnFailure,
    ) -> Result<CommandResult<T>, CommandError> {
        let work = command.take_work()?;

        let started = Instant::now();
        let timeout = effective_timeout(&*self.config, command, options.timeout);
        let caller = options.cancellation.unwrap_or_else(CancellationToken::new);

        let result = self.run(command, work, timeout, &caller).await;
        let total = started.elapsed();
        let status = match &result {
            Ok(_) => CommandStatus::RanToCompletion,
            Err(err) => err.status(),
        };

        match status {
            CommandStatus::TimedOut => {
                tracing::warn!(command = %command.name(), ?timeout, "command timed out")
            }
            _ => tracing::debug!(command = %command.name(), %status, ?total, "command finished"),
        }

        self.events.emit(&IsolationEvent::CommandInvoked {
            group: command.group().clone(),
            command: command.shared_name(),
            status,
            on_failure,
            execute: command.execution_time(),
            total,
            timestamp: StdInstant::now(),
        });

        let result = result.map_err(|source| CommandError::Failed {
            context: CommandContext {
                command: command.shared_name(),
                status,
                timeout,
                breaker: command.breaker_key().clone(),
                bulkhead: command.bulkhead_key().clone(),
            },
            source,
        });
        Ok(CommandResult::new(status, result))
    }

    /// Runs the bulkhead layer inside this invocation's timeout and
    /// cancellation scope.
    async fn run<T>(
        &self,
        command: &Command<T>,
        work: Work<T>,
        timeout: Option<Duration>,
        caller: &CancellationToken,
    ) -> Result<T, IsolationError> {
        // A child token: our timeout cancels the work, never the caller.
        let scope = caller.child_token();
        let pipeline = self.bulkhead.invoke(command, work, scope.clone());
        tokio::pin!(pipeline);

        let finished = match timeout {
            Some(timeout) => {
                tokio::select! {
                    biased;
                    result = &mut pipeline => Ok(result),
                    _ = caller.cancelled() => Err(Interrupt::Canceled),
                    _ = tokio::time::sleep(timeout) => Err(Interrupt::TimedOut(timeout)),
                }
            }
            None => {
                tokio::select! {
                    biased;
                    result = &mut pipeline => Ok(result),
                    _ = caller.cancelled() => Err(Interrupt::Canceled),
                }
            }
        };

        let result = match finished {
            Ok(result) => result,
            Err(interrupt) => {
                scope.cancel();
                // Work watching its token gets one poll to finish with its own
                // error. Anything still pending is dropped here.
                let source = match pipeline.as_mut().now_or_never() {
                    Some(Err(IsolationError::Faulted(err))) => Some(err),
                    _ => None,
                };
                return Err(interrupt.into_error(source));
            }
        };

        // Work that returned an error because it saw the token fire is
        // classified by whose token fired. Its error is kept as the source.
        match result {
            Err(IsolationError::Faulted(err)) if caller.is_cancelled() => {
                Err(Interrupt::Canceled.into_error(Some(err)))
            }
            Err(IsolationError::Faulted(err)) if scope.is_cancelled() => {
                Err(Interrupt::TimedOut(timeout.unwrap_or_default()).into_error(Some(err)))
            }
            other => other,
        }
    }
}

/// Why the invoker stopped waiting on the pipeline.
#[derive(Debug, Clone, Copy)]
enum Interrupt {
    Canceled,
    TimedOut(Duration),
}

impl Interrupt {
    fn into_error(self, source: Option<BoxError>) -> IsolationError {
        match self {
            Interrupt::Canceled => IsolationError::Canceled { source },
            Interrupt::TimedOut(timeout) => IsolationError::TimedOut { timeout, source },
        }
    }
}

impl std::fmt::Debug for CommandInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInvoker")
            .field("bulkhead", &self.bulkhead)
            .field("listeners", &self.events.len())
            .finish()
    }
}

/// Builder for [`CommandInvoker`].
///
/// Registries are created from the configuration unless supplied.
pub struct CommandInvokerBuilder {
    config: SharedConfig,
    listeners: EventListeners<IsolationEvent>,
    ignored: IgnoredErrors,
    breakers: Option<Arc<BreakerRegistry>>,
    bulkheads: Option<Arc<BulkheadRegistry>>,
}

impl CommandInvokerBuilder {
    fn new(config: SharedConfig) -> Self {
        Self {
            config,
            listeners: EventListeners::new(),
            ignored: IgnoredErrors::new(),
            breakers: None,
            bulkheads: None,
        }
    }

    /// Adds a listener to the event sink.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<IsolationEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Adds a closure listener to the event sink.
    pub fn on_event<F>(self, f: F) -> Self
    where
        F: Fn(&IsolationEvent) + Send + Sync + 'static,
    {
        self.listener(bulwark_core::FnListener::new(f))
    }

    /// Records every event through the `metrics` facade.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(self) -> Self {
        self.listener(bulwark_core::MetricsRecorderListener::new())
    }

    /// Counts errors of type `E` as breaker successes.
    pub fn ignore<E: Error + 'static>(mut self) -> Self {
        self.ignored = self.ignored.ignore::<E>();
        self
    }

    /// Replaces the set of errors counted as breaker successes.
    pub fn ignored_errors(mut self, ignored: IgnoredErrors) -> Self {
        self.ignored = ignored;
        self
    }

    /// Uses an existing breaker registry.
    ///
    /// The registry keeps reporting to the sink it was created with.
    pub fn breakers(mut self, breakers: Arc<BreakerRegistry>) -> Self {
        self.breakers = Some(breakers);
        self
    }

    /// Uses an existing bulkhead registry.
    pub fn bulkheads(mut self, bulkheads: Arc<BulkheadRegistry>) -> Self {
        self.bulkheads = Some(bulkheads);
        self
    }

    /// Builds the invoker chain.
    pub fn build(self) -> CommandInvoker {
        let events: EventSink = Arc::new(self.listeners);
        let breakers = self.breakers.unwrap_or_else(|| {
            Arc::new(BreakerRegistry::new(
                Arc::clone(&self.config),
                Arc::clone(&events),
            ))
        });
        let bulkheads = self
            .bulkheads
            .unwrap_or_else(|| BulkheadRegistry::new(Arc::clone(&self.config)));

        let breaker = BreakerInvoker::new(breakers, self.ignored, Arc::clone(&events));
        let bulkhead = BulkheadInvoker::new(
            bulkheads,
            breaker,
            Arc::clone(&self.config),
            Arc::clone(&events),
        );
        CommandInvoker::new(bulkhead, self.config, events)
    }
}

impl std::fmt::Debug for CommandInvokerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInvokerBuilder")
            .field("listeners", &self.listeners.len())
            .field("ignored", &self.ignored)
            .finish()
    }
}
