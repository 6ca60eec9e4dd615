//! Property-based tests for bulwark.
//!
//! Run with: cargo test --test property_tests

pub mod breaker;
pub mod bulkhead;
pub mod metrics;
