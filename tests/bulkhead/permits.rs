use bulwark_bulkhead::{BulkheadRegistry, SemaphoreBulkhead};
use bulwark_core::{GroupKey, MemoryConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

#[test]
fn capacity_n_admits_exactly_n() {
    let bulkhead = SemaphoreBulkhead::new(GroupKey::named("Capacity"), 3);
    let permits: Vec<_> = (0..3).map(|_| bulkhead.try_enter()).collect();
    assert!(permits.iter().all(Option::is_some));
    assert!(bulkhead.try_enter().is_none());
    assert_eq!(bulkhead.available(), 0);
    assert_eq!(bulkhead.in_flight(), 3);

    drop(permits);
    assert_eq!(bulkhead.available(), 3);
}

#[test]
fn concurrent_entries_never_exceed_capacity() {
    const CAPACITY: usize = 4;
    const THREADS: usize = 32;

    let bulkhead = Arc::new(SemaphoreBulkhead::new(GroupKey::named("Contended"), CAPACITY));
    let admitted = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let bulkhead = Arc::clone(&bulkhead);
            let admitted = Arc::clone(&admitted);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let permit = bulkhead.try_enter();
                if permit.is_some() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
                // Hold every permit until all threads have tried.
                barrier.wait();
                drop(permit);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(admitted.load(Ordering::SeqCst), CAPACITY);
    assert_eq!(bulkhead.available(), CAPACITY);
}

#[tokio::test]
async fn permit_is_released_when_the_holder_panics() {
    let bulkhead = Arc::new(SemaphoreBulkhead::new(GroupKey::named("Panics"), 1));
    let b = Arc::clone(&bulkhead);
    let task = tokio::spawn(async move {
        let _permit = b.try_enter();
        panic!("work blew up");
    });
    assert!(task.await.is_err());
    assert_eq!(bulkhead.available(), 1);
}

#[tokio::test]
async fn permit_is_released_when_the_holder_is_aborted() {
    let bulkhead = Arc::new(SemaphoreBulkhead::new(GroupKey::named("Aborted"), 1));
    let b = Arc::clone(&bulkhead);
    let task = tokio::spawn(async move {
        let _permit = b.try_enter();
        std::future::pending::<()>().await;
    });
    tokio::task::yield_now().await;
    task.abort();
    let _ = task.await;
    assert_eq!(bulkhead.available(), 1);
}

#[test]
fn registry_uses_the_group_then_default_capacity() {
    let registry = BulkheadRegistry::new(MemoryConfig::shared([
        ("bulkhead.default.maxConcurrent", "7"),
        ("bulkhead.Search.maxConcurrent", "2"),
    ]));
    assert_eq!(registry.get(&GroupKey::named("Search")).max_concurrent(), 2);
    assert_eq!(registry.get(&GroupKey::named("Catalog")).max_concurrent(), 7);

    let mut groups: Vec<_> = registry
        .groups()
        .iter()
        .map(|g| g.name().to_string())
        .collect();
    groups.sort();
    assert_eq!(groups, ["Catalog", "Search"]);
}

#[test]
fn zero_capacity_rejects_everything() {
    let registry = BulkheadRegistry::new(MemoryConfig::shared([(
        "bulkhead.Closed.maxConcurrent",
        "0",
    )]));
    assert!(registry.get(&GroupKey::named("Closed")).try_enter().is_none());
}
