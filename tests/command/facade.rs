use bulwark::prelude::*;
use std::io;

#[tokio::test]
async fn prelude_covers_a_full_invocation() {
    let config = MemoryConfig::shared([("bulkhead.Facade.maxConcurrent", "1")]);
    let invoker = CommandInvoker::builder(config).build();

    let command = Command::builder("Facade", "Echo").build(|_| async { Ok::<_, io::Error>(7) });
    let result: CommandResult<i32> = invoker
        .invoke_return(&command, InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(result.status(), CommandStatus::RanToCompletion);
    assert_eq!(result.into_value(), Some(7));

    let bulkhead = invoker.bulkheads().get(&GroupKey::named("Facade"));
    assert_eq!(bulkhead.max_concurrent(), 1);
}

#[test]
fn components_are_reachable_by_module() {
    let snapshot = bulwark::circuitbreaker::MetricsSnapshot::from_counts(1, 1);
    assert_eq!(snapshot.error_percentage, 50);
    assert_eq!(bulwark::bulkhead::DEFAULT_MAX_CONCURRENT, 10);
    assert_eq!(bulwark::command::DEFAULT_TIMEOUT.as_millis(), 2000);
}
