use super::registry;
use bulwark_core::GroupKey;

fn tripped_after(min_ops: u64, threshold: u32, successes: u64, failures: u64) -> bool {
    let min_ops = min_ops.to_string();
    let threshold = threshold.to_string();
    let (_config, registry, _events) = registry(&[
        ("breaker.default.minimumOperations", min_ops.as_str()),
        ("breaker.default.thresholdPercentage", threshold.as_str()),
        ("metrics.default.snapshotTtlMillis", "0"),
    ]);
    let breaker = registry.get(&GroupKey::named("Thresholds"));
    for _ in 0..successes {
        breaker.metrics().mark_success();
    }
    for _ in 0..failures {
        breaker.metrics().mark_failure();
    }
    !breaker.is_allowing()
}

#[tokio::test(start_paused = true)]
async fn exactly_at_both_thresholds_trips() {
    // 10 operations, 50% errors.
    assert!(tripped_after(10, 50, 5, 5));
}

#[tokio::test(start_paused = true)]
async fn one_operation_short_does_not_trip() {
    assert!(!tripped_after(10, 50, 4, 5));
}

#[tokio::test(start_paused = true)]
async fn just_below_the_percentage_does_not_trip() {
    // 4/9 = 44%.
    assert!(!tripped_after(9, 45, 5, 4));
}

#[tokio::test(start_paused = true)]
async fn rounding_decides_the_boundary() {
    // 2/3 = 66.67% rounds to 67.
    assert!(tripped_after(3, 67, 1, 2));
    // 1/3 = 33.33% rounds to 33.
    assert!(!tripped_after(3, 34, 2, 1));
}

#[tokio::test(start_paused = true)]
async fn defaults_need_ten_operations_at_fifty_percent() {
    let (_config, registry, _events) = registry(&[("metrics.default.snapshotTtlMillis", "0")]);
    let breaker = registry.get(&GroupKey::named("Defaults"));
    for _ in 0..9 {
        breaker.metrics().mark_failure();
    }
    assert!(breaker.is_allowing());
    breaker.metrics().mark_failure();
    assert!(!breaker.is_allowing());
}

#[tokio::test(start_paused = true)]
async fn thresholds_are_read_live() {
    let (config, registry, _events) = registry(&[
        ("breaker.Live.minimumOperations", "100"),
        ("metrics.Live.snapshotTtlMillis", "0"),
    ]);
    let breaker = registry.get(&GroupKey::named("Live"));
    for _ in 0..5 {
        breaker.metrics().mark_failure();
    }
    assert!(breaker.is_allowing());

    config.set("breaker.Live.minimumOperations", "5");
    assert!(!breaker.is_allowing());
}
