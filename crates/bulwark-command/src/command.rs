//! The unit of work the pipeline protects.

use crate::error::CommandError;
use bulwark_core::{BoxError, GroupKey};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The type-erased work function a [`Command`] carries.
pub(crate) type Work<T> =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<T, BoxError>> + Send>;

/// A named, single-use unit of work.
///
/// The work function receives a [`CancellationToken`] that fires when the
/// command times out or the caller cancels. Async work that awaits is
/// stopped at its next suspension point either way; the token is for work
/// that wants to notice sooner (or clean up first).
///
/// A command may be invoked exactly once. A second invocation fails with
/// [`CommandError::AlreadyInvoked`] whatever the failure mode.
///
/// # Example
///
/// ```rust
/// use bulwark_command::Command;
/// use std::time::Duration;
///
/// let command = Command::builder("Payments", "Charge")
///     .timeout(Duration::from_millis(500))
///     .build(|_token| async move { Ok::<_, std::io::Error>(42) });
///
/// assert_eq!(command.name(), "Payments.Charge");
/// assert_eq!(command.breaker_key().name(), "Payments");
/// ```
pub struct Command<T> {
    name: Arc<str>,
    group: GroupKey,
    breaker_key: GroupKey,
    bulkhead_key: GroupKey,
    default_timeout: Option<Duration>,
    work: Mutex<Option<Work<T>>>,
    invoked: AtomicBool,
    execution_time: Mutex<Option<Duration>>,
}

impl Command<()> {
    /// Starts building a command named `<group>.<name>`.
    ///
    /// The breaker and bulkhead keys default to the group.
    pub fn builder(group: impl Into<GroupKey>, name: &str) -> CommandBuilder {
        CommandBuilder::new(group.into(), name)
    }
}

impl<T> Command<T> {
    /// Full name, `<group>.<name>`. Also the configuration key segment for
    /// `command.<name>.Timeout`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// The command's group.
    pub fn group(&self) -> &GroupKey {
        &self.group
    }

    /// Key of the breaker guarding this command.
    pub fn breaker_key(&self) -> &GroupKey {
        &self.breaker_key
    }

    /// Key of the bulkhead guarding this command.
    pub fn bulkhead_key(&self) -> &GroupKey {
        &self.bulkhead_key
    }

    /// Timeout the command was built with, used when neither the invocation
    /// nor configuration specifies one.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// How long the work function ran, once it has run.
    pub fn execution_time(&self) -> Option<Duration> {
        *self.execution_time.lock()
    }

    /// Returns `true` once the command has been handed to an invoker.
    pub fn is_invoked(&self) -> bool {
        self.invoked.load(Ordering::Acquire)
    }

    pub(crate) fn set_execution_time(&self, elapsed: Duration) {
        *self.execution_time.lock() = Some(elapsed);
    }

    /// Claims the work function. Only the first caller succeeds.
    pub(crate) fn take_work(&self) -> Result<Work<T>, CommandError> {
        let already_invoked = || CommandError::AlreadyInvoked {
            command: self.shared_name(),
        };
        if self.invoked.swap(true, Ordering::AcqRel) {
            return Err(already_invoked());
        }
        self.work.lock().take().ok_or_else(already_invoked)
    }
}

impl<T> fmt::Debug for Command<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("breaker_key", &self.breaker_key)
            .field("bulkhead_key", &self.bulkhead_key)
            .field("default_timeout", &self.default_timeout)
            .field("invoked", &self.is_invoked())
            .finish()
    }
}

/// Builder for [`Command`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    name: Arc<str>,
    group: GroupKey,
    breaker_key: GroupKey,
    bulkhead_key: GroupKey,
    default_timeout: Option<Duration>,
}

impl CommandBuilder {
    fn new(group: GroupKey, name: &str) -> Self {
        Self {
            name: Arc::from(format!("{group}.{name}")),
            breaker_key: group.clone(),
            bulkhead_key: group.clone(),
            group,
            default_timeout: None,
        }
    }

    /// Uses the breaker named `key` instead of the group's.
    pub fn breaker(mut self, key: impl Into<GroupKey>) -> Self {
        self.breaker_key = key.into();
        self
    }

    /// Uses the bulkhead named `key` instead of the group's.
    pub fn bulkhead(mut self, key: impl Into<GroupKey>) -> Self {
        self.bulkhead_key = key.into();
        self
    }

    /// Sets the timeout used when the invocation and configuration give none.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Name the built command will have.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds the command around `work`.
    pub fn build<T, F, Fut, E>(self, work: F) -> Command<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
        T: Send + 'static,
    {
        let work: Work<T> = Box::new(move |token| {
            let fut = work(token);
            Box::pin(async move { fut.await.map_err(Into::into) })
        });

        Command {
            name: self.name,
            group: self.group,
            breaker_key: self.breaker_key,
            bulkhead_key: self.bulkhead_key,
            default_timeout: self.default_timeout,
            work: Mutex::new(Some(work)),
            invoked: AtomicBool::new(false),
            execution_time: Mutex::new(None),
        }
    }
}
