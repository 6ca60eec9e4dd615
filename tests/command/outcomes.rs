use super::{fail, init_tracing, sleep_for, succeed, Pipeline};
use bulwark_command::{
    CancellationToken, Command, CommandError, CommandInvoker, CommandStatus, InvokeOptions,
    IsolationError, OnFailure,
};
use bulwark_core::{GroupKey, IsolationEvent, MemoryConfig};
use std::error::Error;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
struct InvalidOrder(&'static str);

impl fmt::Display for InvalidOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid order: {}", self.0)
    }
}

impl Error for InvalidOrder {}

#[tokio::test(start_paused = true)]
async fn sleeping_past_the_configured_timeout_is_timed_out() {
    let p = Pipeline::new(&[("command.Sleepy.Call.Timeout", "200")]);
    let result = p
        .invoker
        .invoke_return(&sleep_for("Sleepy", Duration::from_secs(10)), InvokeOptions::new())
        .await
        .unwrap();

    assert_eq!(result.status(), CommandStatus::TimedOut);
    let err = result.error().unwrap();
    assert!(err.is_timeout());
    assert!(!err.is_canceled());
    assert!(matches!(
        err.isolation_error(),
        Some(IsolationError::TimedOut { timeout, .. }) if *timeout == Duration::from_millis(200)
    ));
}

#[tokio::test(start_paused = true)]
async fn zero_or_negative_timeouts_mean_unconfigured() {
    for value in ["0", "-5"] {
        let p = Pipeline::new(&[("command.Unset.Call.Timeout", value)]);
        let command = Command::builder("Unset", "Call")
            .timeout(Duration::from_millis(300))
            .build(|_| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok::<_, io::Error>(())
            });
        let err = p
            .invoker
            .invoke_throw(&command, InvokeOptions::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.context().unwrap().timeout,
            Some(Duration::from_millis(300)),
            "value {value}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn ignore_timeouts_switch_disables_every_timeout() {
    let p = Pipeline::new(&[("ignoreTimeouts", "true"), ("command.Patient.Call.Timeout", "10")]);
    let value = p
        .invoker
        .invoke_throw(&sleep_for("Patient", Duration::from_secs(60)), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(value, "slow");
}

#[tokio::test]
async fn second_invocation_is_a_caller_bug_in_either_mode() {
    let p = Pipeline::new(&[]);
    let command = succeed("Once");
    assert_eq!(
        p.invoker
            .invoke_return(&command, InvokeOptions::new())
            .await
            .unwrap()
            .status(),
        CommandStatus::RanToCompletion
    );
    assert!(command.is_invoked());

    let thrown = p.invoker.invoke_throw(&command, InvokeOptions::new()).await;
    let returned = p.invoker.invoke_return(&command, InvokeOptions::new()).await;
    for err in [thrown.unwrap_err(), returned.unwrap_err()] {
        assert!(matches!(err, CommandError::AlreadyInvoked { .. }));
        assert_eq!(err.to_string(), "command 'Once.Call' was already invoked");
    }
}

#[tokio::test]
async fn ignored_errors_propagate_but_count_as_successes() {
    init_tracing();
    let config = MemoryConfig::shared([
        ("breaker.Orders.minimumOperations", "1"),
        ("breaker.Orders.thresholdPercentage", "1"),
        ("metrics.Orders.snapshotTtlMillis", "0"),
    ]);
    let invoker = CommandInvoker::builder(config)
        .ignore::<InvalidOrder>()
        .build();

    for _ in 0..5 {
        let command = Command::builder("Orders", "Place")
            .build(|_| async { Err::<(), _>(InvalidOrder("quantity must be positive")) });
        let err = invoker
            .invoke_throw(&command, InvokeOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(CommandStatus::Faulted));
        assert_eq!(
            err.downcast_ref::<InvalidOrder>().unwrap().to_string(),
            "invalid order: quantity must be positive"
        );
    }

    let breaker = invoker.breakers().get(&GroupKey::named("Orders"));
    assert!(!breaker.is_tripped());
    assert_eq!(breaker.metrics().snapshot().error_percentage, 0);
    assert_eq!(breaker.metrics().snapshot().total, 5);
}

#[tokio::test]
async fn throw_and_return_modes_agree_on_the_status() {
    let p = Pipeline::new(&[]);
    let thrown = p
        .invoker
        .invoke_throw(&fail("Modes"), InvokeOptions::new())
        .await
        .unwrap_err();
    let returned = p
        .invoker
        .invoke_return(&fail("Modes"), InvokeOptions::new())
        .await
        .unwrap();

    assert_eq!(thrown.status(), Some(returned.status()));
    assert_eq!(
        thrown.to_string(),
        returned.error().unwrap().to_string(),
    );
    assert!(thrown.source().is_some());

    let modes: Vec<OnFailure> = p
        .events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            IsolationEvent::CommandInvoked { on_failure, .. } => Some(*on_failure),
            _ => None,
        })
        .collect();
    assert_eq!(modes, [OnFailure::Throw, OnFailure::Return]);
}

#[tokio::test(start_paused = true)]
async fn caller_cancellation_is_canceled_not_timed_out() {
    let p = Pipeline::new(&[]);
    let caller = CancellationToken::new();
    caller.cancel();

    let result = p
        .invoker
        .invoke_return(
            &sleep_for("Impatient", Duration::from_secs(1)),
            InvokeOptions::new().cancellation(caller),
        )
        .await
        .unwrap();
    assert_eq!(result.status(), CommandStatus::Canceled);
    assert!(result.error().unwrap().is_canceled());
}

#[tokio::test(start_paused = true)]
async fn work_sees_the_scope_token_fire_on_timeout() {
    let p = Pipeline::new(&[]);
    let observed = Arc::new(Mutex::new(None));
    let o = Arc::clone(&observed);
    let command = Command::builder("Observer", "Call")
        .timeout(Duration::from_millis(100))
        .build(move |token: CancellationToken| {
            let watcher = token.clone();
            let o = Arc::clone(&o);
            tokio::spawn(async move {
                watcher.cancelled().await;
                *o.lock().unwrap() = Some(tokio::time::Instant::now());
            });
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, io::Error>(())
            }
        });

    let started = tokio::time::Instant::now();
    let result = p
        .invoker
        .invoke_return(&command, InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(result.status(), CommandStatus::TimedOut);

    tokio::task::yield_now().await;
    let fired = observed.lock().unwrap().expect("token was cancelled");
    assert_eq!(fired - started, Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn every_invocation_reports_execute_and_total_times() {
    let p = Pipeline::new(&[("bulkhead.Timing.maxConcurrent", "0")]);
    let _ = p
        .invoker
        .invoke_return(&succeed("Timing"), InvokeOptions::new())
        .await;
    let _ = p
        .invoker
        .invoke_return(&succeed("Timed"), InvokeOptions::new())
        .await;
    let _ = p
        .invoker
        .invoke_return(
            &sleep_for("Abandoned", Duration::from_secs(60)),
            InvokeOptions::new().timeout(Duration::from_millis(50)),
        )
        .await;

    let timings: Vec<(CommandStatus, bool)> = p
        .events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            IsolationEvent::CommandInvoked {
                status, execute, ..
            } => Some((*status, execute.is_some())),
            _ => None,
        })
        .collect();
    assert_eq!(
        timings,
        [
            (CommandStatus::RejectedByBulkhead, false),
            (CommandStatus::RanToCompletion, true),
            (CommandStatus::TimedOut, true),
        ]
    );
}

#[tokio::test]
async fn detached_failures_are_recorded_not_raised() {
    let p = Pipeline::new(&[]);
    let handle = p.invoker.invoke_detached(fail("Background"), InvokeOptions::new());
    handle.await.unwrap();

    assert_eq!(p.count("command_invoked"), 1);
    assert_eq!(p.count("breaker_failure_count"), 1);
}
