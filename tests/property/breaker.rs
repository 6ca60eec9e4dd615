//! Property tests for the failure-percentage breaker.
//!
//! Invariants tested:
//! - Trips iff total >= minimumOperations and errorPercentage >= thresholdPercentage
//! - Once tripped, repeated admission checks reject and fire one trip event

use bulwark_circuitbreaker::{BreakerRegistry, MetricsSnapshot};
use bulwark_core::{
    EventListeners, EventSink, FnListener, GroupKey, IsolationEvent, MemoryConfig,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn breaker_registry(min_ops: u64, threshold: u32, trips: Arc<AtomicUsize>) -> BreakerRegistry {
    let config = MemoryConfig::shared([
        ("breaker.Prop.minimumOperations".to_string(), min_ops.to_string()),
        ("breaker.Prop.thresholdPercentage".to_string(), threshold.to_string()),
        ("metrics.Prop.snapshotTtlMillis".to_string(), "0".to_string()),
    ]);
    let mut listeners = EventListeners::new();
    listeners.add(FnListener::new(move |event: &IsolationEvent| {
        if matches!(event, IsolationEvent::BreakerTripped { .. }) {
            trips.fetch_add(1, Ordering::SeqCst);
        }
    }));
    let sink: EventSink = Arc::new(listeners);
    BreakerRegistry::new(config, sink)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the trip decision depends only on the snapshot and thresholds
    #[test]
    fn trips_iff_both_thresholds_are_met(
        successes in 0u64..60,
        failures in 0u64..60,
        min_ops in 0u64..80,
        threshold in 0u32..=100,
    ) {
        let registry = breaker_registry(min_ops, threshold, Arc::new(AtomicUsize::new(0)));
        let breaker = registry.get(&GroupKey::named("Prop"));
        for _ in 0..successes {
            breaker.metrics().mark_success();
        }
        for _ in 0..failures {
            breaker.metrics().mark_failure();
        }

        let snapshot = MetricsSnapshot::from_counts(successes, failures);
        let expected = snapshot.total >= min_ops && snapshot.error_percentage >= threshold;

        prop_assert_eq!(!breaker.is_allowing(), expected);
        prop_assert_eq!(breaker.is_tripped(), expected);
    }

    /// Property: rejection is idempotent and the trip event fires once
    #[test]
    fn repeated_checks_fire_one_trip_event(checks in 1usize..50) {
        let trips = Arc::new(AtomicUsize::new(0));
        let registry = breaker_registry(1, 1, Arc::clone(&trips));
        let breaker = registry.get(&GroupKey::named("Prop"));
        breaker.metrics().mark_failure();

        for _ in 0..checks {
            prop_assert!(!breaker.is_allowing());
        }
        prop_assert_eq!(trips.load(Ordering::SeqCst), 1);
    }
}
