//! Failure-percentage circuit breaker.
//!
//! The breaker is either *fixed* (calls flow) or *tripped* (calls are
//! rejected). It trips when its metrics window holds at least
//! `minimumOperations` operations and the error percentage is at or above
//! `thresholdPercentage`. After `trippedDuration` a single test call is let
//! through; if it succeeds the breaker is fixed and the metrics are cleared,
//! otherwise another test is allowed one `trippedDuration` later.
//!
//! ```text
//!            error% >= threshold
//!   Fixed ──────────────────────────► Tripped ◄──┐
//!     ▲                                  │       │ duration elapsed,
//!     │   single test succeeds           ▼       │ test not back yet
//!     └──────────────────────── SingleTestInFlight
//! ```
//!
//! A trip is flipped under a short lock, so exactly one caller performs (and
//! reports) each trip. Claiming the single test uses `try_lock`: a caller
//! that finds the lock held is rejected without waiting. The holder need not
//! be a competing claimant; [`FailurePercentageBreaker::state`] and
//! [`FailurePercentageBreaker::mark_success`] take the same lock. Such a
//! rejection leaves the test slot unclaimed, so the next caller can still
//! take it.

use crate::config::BreakerProperties;
use crate::metrics::{CommandMetrics, MetricsSnapshot};
use bulwark_core::{EventSink, GroupKey, IsolationEvent, SharedConfig};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Observable state of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BreakerState {
    /// Calls are allowed.
    Fixed,
    /// Tripped, still inside the tripped duration.
    TrippedWaiting,
    /// Tripped, and the next call will be let through as a test.
    SingleTestEligible,
    /// Tripped, with a test call admitted and not yet reported back.
    SingleTestInFlight,
}

impl BreakerState {
    /// Returns `true` for every state except [`BreakerState::Fixed`].
    pub fn is_tripped(&self) -> bool {
        !matches!(self, BreakerState::Fixed)
    }
}

struct TripState {
    last_tripped: Instant,
    single_test_in_flight: bool,
}

/// Circuit breaker that trips on the error percentage of its metrics.
///
/// Failures are never reported to the breaker directly; they go into
/// [`CommandMetrics`], which the breaker consults on admission. Successes
/// are reported through [`mark_success`](Self::mark_success) so a single
/// test call can fix a tripped breaker.
pub struct FailurePercentageBreaker {
    key: GroupKey,
    metrics: Arc<CommandMetrics>,
    properties: BreakerProperties,
    events: EventSink,
    tripped: AtomicBool,
    state: Mutex<TripState>,
}

impl FailurePercentageBreaker {
    /// Creates a fixed breaker for `key` watching `metrics`.
    pub fn new(
        key: GroupKey,
        metrics: Arc<CommandMetrics>,
        config: SharedConfig,
        events: EventSink,
    ) -> Self {
        Self {
            properties: BreakerProperties::new(config, key.clone()),
            key,
            metrics,
            events,
            tripped: AtomicBool::new(false),
            state: Mutex::new(TripState {
                last_tripped: Instant::now(),
                single_test_in_flight: false,
            }),
        }
    }

    /// The breaker's group key.
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// The metrics window this breaker trips on.
    pub fn metrics(&self) -> &Arc<CommandMetrics> {
        &self.metrics
    }

    /// The live breaker configuration.
    pub fn properties(&self) -> &BreakerProperties {
        &self.properties
    }

    /// Returns `true` if the breaker is currently tripped.
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Decides whether a call may proceed.
    ///
    /// `forceTripped` wins over everything, including `forceFixed`. While
    /// `forceFixed` is set every call is allowed, but the breaker still trips
    /// internally so clearing the flag takes effect immediately.
    pub fn is_allowing(&self) -> bool {
        if self.properties.force_tripped() {
            return false;
        }

        if self.properties.force_fixed() {
            self.check_and_set_tripped();
            return true;
        }

        if self.is_tripped() {
            return self.allow_single_test();
        }

        !self.check_and_set_tripped()
    }

    /// Reports a successful call that ran for `elapsed`.
    ///
    /// Fixes a tripped breaker unless the call started before the breaker
    /// last tripped (or last admitted a test). Such stale successes say
    /// nothing about the current health of the dependency.
    pub fn mark_success(&self, elapsed: Duration) {
        if !self.is_tripped() {
            return;
        }

        let mut state = self.state.lock();
        if !self.is_tripped() {
            return;
        }

        let started = Instant::now().checked_sub(elapsed);
        match started {
            Some(started) if started >= state.last_tripped => {}
            _ => {
                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = %self.key, ?elapsed, "ignoring success that started before the trip");
                return;
            }
        }

        self.tripped.store(false, Ordering::Release);
        state.single_test_in_flight = false;
        drop(state);

        self.metrics.reset();

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %self.key, "circuit breaker fixed");

        self.events.emit(&IsolationEvent::BreakerFixed {
            breaker: self.key.clone(),
            timestamp: std::time::Instant::now(),
        });
    }

    /// Returns the breaker's current state.
    pub fn state(&self) -> BreakerState {
        if !self.is_tripped() {
            return BreakerState::Fixed;
        }

        let state = self.state.lock();
        let waited = Instant::now().saturating_duration_since(state.last_tripped);
        if waited >= self.properties.tripped_duration() {
            BreakerState::SingleTestEligible
        } else if state.single_test_in_flight {
            BreakerState::SingleTestInFlight
        } else {
            BreakerState::TrippedWaiting
        }
    }

    /// Builds a gauge event describing configuration and state.
    pub fn gauge(&self) -> IsolationEvent {
        let MetricsSnapshot {
            total,
            error_percentage,
        } = self.metrics.snapshot();
        IsolationEvent::BreakerGauge {
            breaker: self.key.clone(),
            minimum_operations: self.properties.minimum_operations(),
            threshold_percentage: self.properties.threshold_percentage(),
            tripped_duration: self.properties.tripped_duration(),
            force_tripped: self.properties.force_tripped(),
            force_fixed: self.properties.force_fixed(),
            tripped: self.is_tripped(),
            total,
            error_percentage,
            timestamp: std::time::Instant::now(),
        }
    }

    /// Trips the breaker if the metrics warrant it. Returns the tripped flag.
    fn check_and_set_tripped(&self) -> bool {
        if self.is_tripped() {
            return true;
        }

        let snapshot = self.metrics.snapshot();
        if snapshot.total < self.properties.minimum_operations()
            || snapshot.error_percentage < self.properties.threshold_percentage()
        {
            return false;
        }

        // Every caller that saw the criteria met rejects; only the first flips.
        let mut state = self.state.lock();
        if self.is_tripped() {
            return true;
        }

        state.last_tripped = Instant::now();
        state.single_test_in_flight = false;
        self.tripped.store(true, Ordering::Release);
        drop(state);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            breaker = %self.key,
            total = snapshot.total,
            error_percentage = snapshot.error_percentage,
            "circuit breaker tripped"
        );

        self.events.emit(&IsolationEvent::BreakerTripped {
            breaker: self.key.clone(),
            timestamp: std::time::Instant::now(),
        });
        true
    }

    /// Admits one call per tripped duration.
    ///
    /// Returns `false` without claiming anything if the state lock is busy.
    fn allow_single_test(&self) -> bool {
        let Some(mut state) = self.state.try_lock() else {
            return false;
        };
        if !self.is_tripped() {
            return true;
        }

        let now = Instant::now();
        if now.saturating_duration_since(state.last_tripped) < self.properties.tripped_duration() {
            return false;
        }

        state.last_tripped = now;
        state.single_test_in_flight = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(breaker = %self.key, "allowing single test call");
        true
    }
}

impl fmt::Debug for FailurePercentageBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailurePercentageBreaker")
            .field("key", &self.key)
            .field("tripped", &self.is_tripped())
            .finish()
    }
}
