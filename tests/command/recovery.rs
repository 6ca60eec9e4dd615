use super::{fail, succeed, Pipeline};
use bulwark_circuitbreaker::BreakerState;
use bulwark_command::{CommandStatus, InvokeOptions};
use bulwark_core::GroupKey;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn failing_dependency_trips_and_recovers() {
    let p = Pipeline::new(&[
        ("breaker.Ledger.minimumOperations", "1"),
        ("breaker.Ledger.thresholdPercentage", "1"),
        ("breaker.Ledger.trippedDurationMillis", "10000"),
        ("metrics.Ledger.snapshotTtlMillis", "0"),
    ]);
    let key = GroupKey::named("Ledger");

    let first = p
        .invoker
        .invoke_return(&fail("Ledger"), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(first.status(), CommandStatus::Faulted);

    let second = p
        .invoker
        .invoke_return(&succeed("Ledger"), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(second.status(), CommandStatus::RejectedByBreaker);
    assert_eq!(p.count("breaker_tripped"), 1);

    tokio::time::advance(Duration::from_millis(11_000)).await;

    let test_call = p
        .invoker
        .invoke_return(&succeed("Ledger"), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(test_call.status(), CommandStatus::RanToCompletion);
    assert_eq!(p.count("breaker_fixed"), 1);

    let breaker = p.invoker.breakers().get(&key);
    assert_eq!(breaker.state(), BreakerState::Fixed);
    // The window restarted at the fix; only the test call's own success is in it.
    let snapshot = breaker.metrics().snapshot();
    assert_eq!(snapshot.total, 1);
    assert_eq!(snapshot.error_percentage, 0);

    let after = p
        .invoker
        .invoke_return(&succeed("Ledger"), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(after.status(), CommandStatus::RanToCompletion);
}

#[tokio::test(start_paused = true)]
async fn failing_test_call_keeps_the_breaker_tripped() {
    let p = Pipeline::new(&[
        ("breaker.Flaky.minimumOperations", "1"),
        ("breaker.Flaky.thresholdPercentage", "1"),
        ("breaker.Flaky.trippedDurationMillis", "1000"),
        ("metrics.Flaky.snapshotTtlMillis", "0"),
    ]);

    p.invoker
        .invoke_return(&fail("Flaky"), InvokeOptions::new())
        .await
        .unwrap();
    tokio::time::advance(Duration::from_millis(1_000)).await;
    // Trips on admission, since the wait is measured from the trip.
    let rejected = p
        .invoker
        .invoke_return(&succeed("Flaky"), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(rejected.status(), CommandStatus::RejectedByBreaker);

    tokio::time::advance(Duration::from_millis(1_000)).await;
    let test_call = p
        .invoker
        .invoke_return(&fail("Flaky"), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(test_call.status(), CommandStatus::Faulted);

    let next = p
        .invoker
        .invoke_return(&succeed("Flaky"), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(next.status(), CommandStatus::RejectedByBreaker);
    assert_eq!(p.count("breaker_fixed"), 0);
}

#[tokio::test(start_paused = true)]
async fn timed_out_test_call_does_not_fix_the_breaker() {
    let p = Pipeline::new(&[
        ("breaker.Hang.minimumOperations", "1"),
        ("breaker.Hang.thresholdPercentage", "1"),
        ("breaker.Hang.trippedDurationMillis", "1000"),
        ("metrics.Hang.snapshotTtlMillis", "0"),
        ("command.Hang.Call.Timeout", "50"),
    ]);

    p.invoker
        .invoke_return(&fail("Hang"), InvokeOptions::new())
        .await
        .unwrap();
    p.invoker
        .invoke_return(&succeed("Hang"), InvokeOptions::new())
        .await
        .unwrap();
    tokio::time::advance(Duration::from_millis(1_000)).await;

    let test_call = p
        .invoker
        .invoke_return(
            &super::sleep_for("Hang", Duration::from_secs(5)),
            InvokeOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(test_call.status(), CommandStatus::TimedOut);
    assert!(p.invoker.breakers().get(&GroupKey::named("Hang")).is_tripped());
}
