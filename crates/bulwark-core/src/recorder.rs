//! Forwards isolation events to the `metrics` facade.
//!
//! Add [`MetricsRecorderListener`] to the pipeline's event sink and install
//! any `metrics` recorder (Prometheus exporter, statsd, ...) to collect:
//!
//! | Metric | Type | Labels |
//! |---|---|---|
//! | `bulwark_breaker_rejected_total` | counter | `breaker`, `command` |
//! | `bulwark_breaker_calls_total` | counter | `breaker`, `outcome` |
//! | `bulwark_breaker_transitions_total` | counter | `breaker`, `to` |
//! | `bulwark_bulkhead_rejected_total` | counter | `bulkhead`, `command` |
//! | `bulwark_bulkhead_entered_total` | counter | `bulkhead` |
//! | `bulwark_bulkhead_left_total` | counter | `bulkhead` |
//! | `bulwark_commands_total` | counter | `command`, `status`, `on_failure` |
//! | `bulwark_command_total_seconds` | histogram | `command`, `status` |
//! | `bulwark_command_execute_seconds` | histogram | `command`, `status` |
//! | `bulwark_breaker_tripped` | gauge | `breaker` |
//! | `bulwark_breaker_error_percentage` | gauge | `breaker` |
//! | `bulwark_breaker_operations` | gauge | `breaker` |
//! | `bulwark_bulkhead_max_concurrent` | gauge | `bulkhead` |
//! | `bulwark_bulkhead_available` | gauge | `bulkhead` |

use crate::events::EventListener;
use crate::isolation_event::IsolationEvent;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::Once;

static METRICS_INIT: Once = Once::new();

/// Event listener that records every [`IsolationEvent`] as a metric.
#[derive(Debug, Clone, Copy)]
pub struct MetricsRecorderListener;

impl MetricsRecorderListener {
    /// Creates the listener, describing the metrics on first use.
    pub fn new() -> Self {
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "bulwark_breaker_rejected_total",
                "Calls rejected by an open circuit breaker"
            );
            describe_counter!(
                "bulwark_breaker_calls_total",
                "Breaker-protected calls by counted outcome"
            );
            describe_counter!(
                "bulwark_breaker_transitions_total",
                "Circuit breaker trips and fixes"
            );
            describe_counter!(
                "bulwark_bulkhead_rejected_total",
                "Calls rejected by a full bulkhead"
            );
            describe_counter!("bulwark_bulkhead_entered_total", "Bulkhead permits acquired");
            describe_counter!("bulwark_bulkhead_left_total", "Bulkhead permits released");
            describe_counter!(
                "bulwark_commands_total",
                "Commands invoked by final status"
            );
            describe_histogram!(
                "bulwark_command_total_seconds",
                "Time spent in the whole invocation pipeline"
            );
            describe_histogram!(
                "bulwark_command_execute_seconds",
                "Time spent in the command's work function"
            );
            describe_gauge!("bulwark_breaker_tripped", "1 if the breaker is tripped");
            describe_gauge!(
                "bulwark_breaker_error_percentage",
                "Error percentage of the breaker's metrics window"
            );
            describe_gauge!(
                "bulwark_breaker_operations",
                "Operations in the breaker's metrics window"
            );
            describe_gauge!(
                "bulwark_bulkhead_max_concurrent",
                "Configured bulkhead capacity"
            );
            describe_gauge!("bulwark_bulkhead_available", "Free bulkhead permits");
        });
        Self
    }
}

impl Default for MetricsRecorderListener {
    fn default() -> Self {
        Self::new()
    }
}

impl EventListener<IsolationEvent> for MetricsRecorderListener {
    fn on_event(&self, event: &IsolationEvent) {
        match event {
            IsolationEvent::RejectedByBreaker {
                breaker, command, ..
            } => {
                counter!(
                    "bulwark_breaker_rejected_total",
                    "breaker" => breaker.name().to_string(),
                    "command" => command.to_string()
                )
                .increment(1);
            }
            IsolationEvent::RejectedByBulkhead {
                bulkhead, command, ..
            } => {
                counter!(
                    "bulwark_bulkhead_rejected_total",
                    "bulkhead" => bulkhead.name().to_string(),
                    "command" => command.to_string()
                )
                .increment(1);
            }
            IsolationEvent::EnterBulkhead { bulkhead, .. } => {
                counter!("bulwark_bulkhead_entered_total", "bulkhead" => bulkhead.name().to_string())
                    .increment(1);
            }
            IsolationEvent::LeaveBulkhead { bulkhead, .. } => {
                counter!("bulwark_bulkhead_left_total", "bulkhead" => bulkhead.name().to_string())
                    .increment(1);
            }
            IsolationEvent::BreakerSuccessCount { breaker, .. } => {
                counter!("bulwark_breaker_calls_total", "breaker" => breaker.name().to_string(), "outcome" => "success")
                    .increment(1);
            }
            IsolationEvent::BreakerFailureCount { breaker, .. } => {
                counter!("bulwark_breaker_calls_total", "breaker" => breaker.name().to_string(), "outcome" => "failure")
                    .increment(1);
            }
            IsolationEvent::BreakerTripped { breaker, .. } => {
                counter!("bulwark_breaker_transitions_total", "breaker" => breaker.name().to_string(), "to" => "tripped")
                    .increment(1);
                gauge!("bulwark_breaker_tripped", "breaker" => breaker.name().to_string()).set(1.0);
            }
            IsolationEvent::BreakerFixed { breaker, .. } => {
                counter!("bulwark_breaker_transitions_total", "breaker" => breaker.name().to_string(), "to" => "fixed")
                    .increment(1);
                gauge!("bulwark_breaker_tripped", "breaker" => breaker.name().to_string()).set(0.0);
            }
            IsolationEvent::CommandInvoked {
                command,
                status,
                on_failure,
                execute,
                total,
                ..
            } => {
                counter!(
                    "bulwark_commands_total",
                    "command" => command.to_string(),
                    "status" => status.as_str(),
                    "on_failure" => on_failure.as_str()
                )
                .increment(1);
                histogram!(
                    "bulwark_command_total_seconds",
                    "command" => command.to_string(),
                    "status" => status.as_str()
                )
                .record(total.as_secs_f64());
                if let Some(execute) = execute {
                    histogram!(
                        "bulwark_command_execute_seconds",
                        "command" => command.to_string(),
                        "status" => status.as_str()
                    )
                    .record(execute.as_secs_f64());
                }
            }
            IsolationEvent::BreakerGauge {
                breaker,
                tripped,
                total,
                error_percentage,
                ..
            } => {
                let name = breaker.name().to_string();
                gauge!("bulwark_breaker_tripped", "breaker" => name.clone())
                    .set(if *tripped { 1.0 } else { 0.0 });
                gauge!("bulwark_breaker_error_percentage", "breaker" => name.clone())
                    .set(*error_percentage as f64);
                gauge!("bulwark_breaker_operations", "breaker" => name).set(*total as f64);
            }
            IsolationEvent::BulkheadGauge {
                bulkhead,
                max_concurrent,
                available,
                ..
            } => {
                let name = bulkhead.name().to_string();
                gauge!("bulwark_bulkhead_max_concurrent", "bulkhead" => name.clone())
                    .set(*max_concurrent as f64);
                gauge!("bulwark_bulkhead_available", "bulkhead" => name).set(*available as f64);
            }
        }
    }
}
