//! Error types for the invocation pipeline.

use bulwark_bulkhead::BulkheadRejected;
use bulwark_circuitbreaker::BreakerRejected;
use bulwark_core::{BoxError, CommandStatus, GroupKey};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a call through the pipeline did not produce a value.
///
/// This is what flows between the invoker layers. Each variant maps onto
/// exactly one [`CommandStatus`]; layers pass it through untouched.
#[derive(Debug, Error)]
pub enum IsolationError {
    /// The bulkhead was full. The work never ran.
    #[error(transparent)]
    BulkheadRejected(#[from] BulkheadRejected),

    /// The breaker was tripped. The work never ran.
    #[error(transparent)]
    BreakerRejected(#[from] BreakerRejected),

    /// The command's own timeout fired.
    #[error("timed out after {timeout:?}")]
    TimedOut {
        /// The effective timeout that elapsed.
        timeout: Duration,
        /// The error the work returned after seeing its token fire, if it
        /// finished before being abandoned.
        #[source]
        source: Option<BoxError>,
    },

    /// The caller's cancellation token fired.
    #[error("canceled by caller")]
    Canceled {
        /// The error the work returned after seeing its token fire.
        #[source]
        source: Option<BoxError>,
    },

    /// The work function returned an error.
    #[error("{0}")]
    Faulted(#[source] BoxError),
}

impl IsolationError {
    /// The status this error classifies as.
    pub fn status(&self) -> CommandStatus {
        match self {
            IsolationError::BulkheadRejected(_) => CommandStatus::RejectedByBulkhead,
            IsolationError::BreakerRejected(_) => CommandStatus::RejectedByBreaker,
            IsolationError::TimedOut { .. } => CommandStatus::TimedOut,
            IsolationError::Canceled { .. } => CommandStatus::Canceled,
            IsolationError::Faulted(_) => CommandStatus::Faulted,
        }
    }

    /// The work function's own error.
    ///
    /// Present when the work faulted, and when it returned an error in
    /// response to a timeout or cancellation.
    pub fn work_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            IsolationError::Faulted(err) => Some(err.as_ref()),
            IsolationError::TimedOut { source, .. } | IsolationError::Canceled { source } => {
                source.as_deref()
            }
            _ => None,
        }
    }
}

/// Diagnostic context attached to every failed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Full command name, `<group>.<name>`.
    pub command: Arc<str>,
    /// Final classification.
    pub status: CommandStatus,
    /// Effective timeout, or `None` if timeouts were disabled.
    pub timeout: Option<Duration>,
    /// Breaker the command ran under.
    pub breaker: GroupKey,
    /// Bulkhead the command ran under.
    pub bulkhead: GroupKey,
}

/// What a caller of the command invoker sees.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The invocation completed with a non-success status.
    #[error("command '{}' {}: {source}", .context.command, .context.status)]
    Failed {
        /// Where and how the command failed.
        context: CommandContext,
        /// The original failure.
        #[source]
        source: IsolationError,
    },

    /// The command was invoked a second time. This is a caller bug and is
    /// reported in every failure mode.
    #[error("command '{command}' was already invoked")]
    AlreadyInvoked {
        /// Full command name.
        command: Arc<str>,
    },
}

impl CommandError {
    /// The final status, or `None` for [`CommandError::AlreadyInvoked`].
    pub fn status(&self) -> Option<CommandStatus> {
        self.context().map(|context| context.status)
    }

    /// Context of a failed invocation.
    pub fn context(&self) -> Option<&CommandContext> {
        match self {
            CommandError::Failed { context, .. } => Some(context),
            CommandError::AlreadyInvoked { .. } => None,
        }
    }

    /// The pipeline error behind a failed invocation.
    pub fn isolation_error(&self) -> Option<&IsolationError> {
        match self {
            CommandError::Failed { source, .. } => Some(source),
            CommandError::AlreadyInvoked { .. } => None,
        }
    }

    /// Consumes the error, returning the pipeline error.
    pub fn into_isolation_error(self) -> Option<IsolationError> {
        match self {
            CommandError::Failed { source, .. } => Some(source),
            CommandError::AlreadyInvoked { .. } => None,
        }
    }

    /// Returns `true` if the command's timeout fired.
    pub fn is_timeout(&self) -> bool {
        self.status() == Some(CommandStatus::TimedOut)
    }

    /// Returns `true` if the caller canceled the command.
    pub fn is_canceled(&self) -> bool {
        self.status() == Some(CommandStatus::Canceled)
    }

    /// Returns `true` if a breaker or bulkhead refused the command.
    pub fn is_rejected(&self) -> bool {
        self.status().is_some_and(|status| status.is_rejected())
    }

    /// Returns `true` if the command was invoked twice.
    pub fn is_already_invoked(&self) -> bool {
        matches!(self, CommandError::AlreadyInvoked { .. })
    }

    /// Downcasts the work function's error to its concrete type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.isolation_error()?.work_error()?.downcast_ref::<E>()
    }
}
