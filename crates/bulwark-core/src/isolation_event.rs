//! The events the invocation pipeline reports.

use crate::events::{EventListeners, ResilienceEvent};
use crate::group_key::GroupKey;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared sink the pipeline emits [`IsolationEvent`]s to.
pub type EventSink = Arc<EventListeners<IsolationEvent>>;

/// Terminal classification of one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// The work function returned successfully.
    RanToCompletion,
    /// The work function returned an error.
    Faulted,
    /// The caller's cancellation token fired.
    Canceled,
    /// The command's own timeout fired.
    TimedOut,
    /// The circuit breaker refused admission; the work never ran.
    RejectedByBreaker,
    /// The bulkhead was at capacity; the work never ran.
    RejectedByBulkhead,
}

impl CommandStatus {
    /// Returns the status as a stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::RanToCompletion => "RanToCompletion",
            CommandStatus::Faulted => "Faulted",
            CommandStatus::Canceled => "Canceled",
            CommandStatus::TimedOut => "TimedOut",
            CommandStatus::RejectedByBreaker => "RejectedByBreaker",
            CommandStatus::RejectedByBulkhead => "RejectedByBulkhead",
        }
    }

    /// Returns `true` for either rejection status.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            CommandStatus::RejectedByBreaker | CommandStatus::RejectedByBulkhead
        )
    }

    /// Returns `true` only for [`CommandStatus::RanToCompletion`].
    pub fn is_success(&self) -> bool {
        matches!(self, CommandStatus::RanToCompletion)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the command invoker does with a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnFailure {
    /// Return the failure to the caller as an error.
    #[default]
    Throw,
    /// Capture the failure in the returned result's status.
    Return,
}

impl OnFailure {
    /// Returns the mode as a stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            OnFailure::Throw => "Throw",
            OnFailure::Return => "Return",
        }
    }
}

/// Events emitted by breakers, bulkheads and the invokers.
#[derive(Debug, Clone)]
pub enum IsolationEvent {
    /// A call was refused by an open breaker.
    RejectedByBreaker {
        /// Breaker that refused.
        breaker: GroupKey,
        /// Name of the rejected command.
        command: Arc<str>,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A call was refused by a full bulkhead.
    RejectedByBulkhead {
        /// Bulkhead that refused.
        bulkhead: GroupKey,
        /// Name of the rejected command.
        command: Arc<str>,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A call acquired a bulkhead permit.
    EnterBulkhead {
        /// Bulkhead entered.
        bulkhead: GroupKey,
        /// Name of the command.
        command: Arc<str>,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A call released its bulkhead permit.
    LeaveBulkhead {
        /// Bulkhead left.
        bulkhead: GroupKey,
        /// Name of the command.
        command: Arc<str>,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A breaker-protected call was counted as a success.
    BreakerSuccessCount {
        /// Breaker credited.
        breaker: GroupKey,
        /// Name of the command.
        command: Arc<str>,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A breaker-protected call was counted as a failure.
    BreakerFailureCount {
        /// Breaker debited.
        breaker: GroupKey,
        /// Name of the command.
        command: Arc<str>,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A breaker moved from fixed to tripped. Fired once per trip.
    BreakerTripped {
        /// Breaker that tripped.
        breaker: GroupKey,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A tripped breaker was fixed by a successful single test.
    BreakerFixed {
        /// Breaker that was fixed.
        breaker: GroupKey,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A command finished passing through the pipeline.
    CommandInvoked {
        /// Group the command belongs to.
        group: GroupKey,
        /// Name of the command.
        command: Arc<str>,
        /// Final classification.
        status: CommandStatus,
        /// Failure mode the command was invoked with.
        on_failure: OnFailure,
        /// Time spent in the work function, if it ran.
        execute: Option<Duration>,
        /// Time spent in the whole pipeline.
        total: Duration,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// Periodic view of a breaker's configuration and state.
    BreakerGauge {
        /// Breaker described.
        breaker: GroupKey,
        /// Configured minimum operations.
        minimum_operations: u64,
        /// Configured trip threshold percentage.
        threshold_percentage: u32,
        /// Configured recovery wait.
        tripped_duration: Duration,
        /// Configured force-tripped flag.
        force_tripped: bool,
        /// Configured force-fixed flag.
        force_fixed: bool,
        /// Whether the breaker is currently tripped.
        tripped: bool,
        /// Operations in the current metrics snapshot.
        total: u64,
        /// Error percentage in the current metrics snapshot.
        error_percentage: u32,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// Periodic view of a bulkhead's capacity.
    BulkheadGauge {
        /// Bulkhead described.
        bulkhead: GroupKey,
        /// Configured capacity.
        max_concurrent: usize,
        /// Permits currently free.
        available: usize,
        /// When the event occurred.
        timestamp: Instant,
    },
}

impl ResilienceEvent for IsolationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::RejectedByBreaker { .. } => "rejected_by_breaker",
            Self::RejectedByBulkhead { .. } => "rejected_by_bulkhead",
            Self::EnterBulkhead { .. } => "enter_bulkhead",
            Self::LeaveBulkhead { .. } => "leave_bulkhead",
            Self::BreakerSuccessCount { .. } => "breaker_success_count",
            Self::BreakerFailureCount { .. } => "breaker_failure_count",
            Self::BreakerTripped { .. } => "breaker_tripped",
            Self::BreakerFixed { .. } => "breaker_fixed",
            Self::CommandInvoked { .. } => "command_invoked",
            Self::BreakerGauge { .. } => "breaker_gauge",
            Self::BulkheadGauge { .. } => "bulkhead_gauge",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::RejectedByBreaker { timestamp, .. }
            | Self::RejectedByBulkhead { timestamp, .. }
            | Self::EnterBulkhead { timestamp, .. }
            | Self::LeaveBulkhead { timestamp, .. }
            | Self::BreakerSuccessCount { timestamp, .. }
            | Self::BreakerFailureCount { timestamp, .. }
            | Self::BreakerTripped { timestamp, .. }
            | Self::BreakerFixed { timestamp, .. }
            | Self::CommandInvoked { timestamp, .. }
            | Self::BreakerGauge { timestamp, .. }
            | Self::BulkheadGauge { timestamp, .. } => *timestamp,
        }
    }

    fn group(&self) -> &GroupKey {
        match self {
            Self::RejectedByBreaker { breaker, .. }
            | Self::BreakerSuccessCount { breaker, .. }
            | Self::BreakerFailureCount { breaker, .. }
            | Self::BreakerTripped { breaker, .. }
            | Self::BreakerFixed { breaker, .. }
            | Self::BreakerGauge { breaker, .. } => breaker,
            Self::RejectedByBulkhead { bulkhead, .. }
            | Self::EnterBulkhead { bulkhead, .. }
            | Self::LeaveBulkhead { bulkhead, .. }
            | Self::BulkheadGauge { bulkhead, .. } => bulkhead,
            Self::CommandInvoked { group, .. } => group,
        }
    }
}
