use bulwark_circuitbreaker::{BreakerState, MetricsSnapshot};

#[test]
fn snapshot_serializes_as_a_plain_record() {
    let json = serde_json::to_value(MetricsSnapshot::from_counts(3, 1)).unwrap();
    assert_eq!(json, serde_json::json!({ "total": 4, "error_percentage": 25 }));

    let back: MetricsSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(back, MetricsSnapshot::from_counts(3, 1));
}

#[test]
fn states_serialize_by_name() {
    assert_eq!(
        serde_json::to_string(&BreakerState::SingleTestInFlight).unwrap(),
        "\"SingleTestInFlight\""
    );
}
