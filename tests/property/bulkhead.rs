//! Property tests for the bulkhead.
//!
//! Invariants tested:
//! - At most `maxConcurrent` permits are held at once
//! - Releasing a permit always returns it to the instance it came from

use bulwark_bulkhead::{BulkheadRegistry, SemaphoreBulkhead};
use bulwark_core::{GroupKey, MemoryConfig};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: min(capacity, attempts) entries succeed
    #[test]
    fn admits_at_most_capacity(capacity in 0usize..32, attempts in 0usize..64) {
        let bulkhead = SemaphoreBulkhead::new(GroupKey::named("PropCapacity"), capacity);
        let permits: Vec<_> = (0..attempts).filter_map(|_| bulkhead.try_enter()).collect();

        prop_assert_eq!(permits.len(), capacity.min(attempts));
        prop_assert_eq!(bulkhead.available(), capacity - permits.len());

        drop(permits);
        prop_assert_eq!(bulkhead.available(), capacity);
    }

    /// Property: permits survive any sequence of resizes
    #[test]
    fn permits_return_home_across_resizes(
        initial in 1usize..16,
        resizes in proptest::collection::vec(1usize..16, 1..8),
    ) {
        let config = MemoryConfig::shared([(
            "bulkhead.PropResize.maxConcurrent".to_string(),
            initial.to_string(),
        )]);
        let registry = BulkheadRegistry::new(config.clone());
        let key = GroupKey::named("PropResize");

        let mut held = Vec::new();
        for size in resizes {
            let current = registry.get(&key);
            if let Some(permit) = current.try_enter() {
                held.push((current, permit));
            }
            config.set("bulkhead.PropResize.maxConcurrent", size.to_string());
        }

        for (bulkhead, permit) in held {
            let before = bulkhead.available();
            permit.release();
            prop_assert_eq!(bulkhead.available(), before + 1);
        }

        let current = registry.get(&key);
        prop_assert_eq!(current.available(), current.max_concurrent());
    }
}
