//! Periodic breaker and bulkhead gauges.

use bulwark_bulkhead::BulkheadRegistry;
use bulwark_circuitbreaker::BreakerRegistry;
use bulwark_core::{EventSink, IsolationEvent};
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Emits one [`IsolationEvent::BreakerGauge`] per breaker and one
/// [`IsolationEvent::BulkheadGauge`] per bulkhead known to the registries.
pub fn emit_gauges(breakers: &BreakerRegistry, bulkheads: &BulkheadRegistry, events: &EventSink) {
    for breaker in breakers.breakers() {
        events.emit(&breaker.gauge());
    }
    for bulkhead in bulkheads.bulkheads() {
        events.emit(&IsolationEvent::BulkheadGauge {
            bulkhead: bulkhead.key().clone(),
            max_concurrent: bulkhead.max_concurrent(),
            available: bulkhead.available(),
            timestamp: StdInstant::now(),
        });
    }
}

/// Shortest period a [`GaugeReporter`] ticks at.
pub const MIN_GAUGE_PERIOD: Duration = Duration::from_millis(1);

/// Background task calling [`emit_gauges`] on a fixed period.
///
/// Periods shorter than [`MIN_GAUGE_PERIOD`] are raised to it. The task
/// stops when the reporter is shut down or dropped.
#[derive(Debug)]
pub struct GaugeReporter {
    stop: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl GaugeReporter {
    /// Spawns the reporter on the current tokio runtime.
    pub fn spawn(
        breakers: Arc<BreakerRegistry>,
        bulkheads: Arc<BulkheadRegistry>,
        events: EventSink,
        period: Duration,
    ) -> Self {
        let stop = CancellationToken::new();
        let token = stop.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period.max(MIN_GAUGE_PERIOD));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => emit_gauges(&breakers, &bulkheads, &events),
                }
            }
            tracing::debug!("gauge reporter stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the reporter and waits for its task to finish.
    pub async fn shutdown(mut self) {
        self.stop.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for GaugeReporter {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
