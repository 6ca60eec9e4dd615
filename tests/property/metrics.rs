//! Property tests for metrics snapshots.

use bulwark_circuitbreaker::MetricsSnapshot;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Property: the error percentage is the rounded failure ratio, within 0..=100
    #[test]
    fn error_percentage_is_the_rounded_ratio(successes in 0u64..10_000, failures in 0u64..10_000) {
        let snapshot = MetricsSnapshot::from_counts(successes, failures);
        prop_assert_eq!(snapshot.total, successes + failures);
        prop_assert!(snapshot.error_percentage <= 100);

        if snapshot.total == 0 {
            prop_assert_eq!(snapshot.error_percentage, 0);
        } else {
            let exact = failures as f64 * 100.0 / snapshot.total as f64;
            prop_assert!((snapshot.error_percentage as f64 - exact).abs() <= 0.5);
        }
    }
}
