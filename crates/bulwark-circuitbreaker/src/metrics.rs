//! Rolling success/failure counts over a time window.
//!
//! Operations are counted into buckets one tenth of the window wide. A bucket
//! falls out of the window once its start is a full window in the past, so
//! the counts a snapshot reports always cover at most the configured window
//! plus one bucket of slack.
//!
//! Computing a snapshot walks every live bucket. The result is cached for
//! `metrics.<group>.snapshotTtlMillis`, so a busy breaker asking "should I
//! trip?" on every call does not pay for the walk each time.

use crate::config::MetricsProperties;
use bulwark_core::{GroupKey, SharedConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

const BUCKETS_PER_WINDOW: u32 = 10;
const MIN_BUCKET_WIDTH: Duration = Duration::from_millis(1);

/// Point-in-time view of a metrics window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Successes plus failures in the window.
    pub total: u64,
    /// `round(100 * failures / total)`, or 0 when the window is empty.
    pub error_percentage: u32,
}

impl MetricsSnapshot {
    /// Builds a snapshot from raw counts.
    pub fn from_counts(successes: u64, failures: u64) -> Self {
        let total = successes + failures;
        let error_percentage = if total == 0 {
            0
        } else {
            ((failures as f64 * 100.0) / total as f64).round() as u32
        };
        Self {
            total,
            error_percentage,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    start: Instant,
    successes: u64,
    failures: u64,
}

#[derive(Debug, Clone, Copy)]
struct CachedSnapshot {
    taken: Instant,
    snapshot: MetricsSnapshot,
}

/// Thread-safe rolling counter of successes and failures for one group.
pub struct CommandMetrics {
    group: GroupKey,
    properties: MetricsProperties,
    buckets: Mutex<VecDeque<Bucket>>,
    cached: Mutex<Option<CachedSnapshot>>,
}

impl CommandMetrics {
    /// Creates an empty window for `group`.
    pub fn new(group: GroupKey, config: SharedConfig) -> Self {
        Self {
            properties: MetricsProperties::new(config, group.clone()),
            group,
            buckets: Mutex::new(VecDeque::with_capacity(BUCKETS_PER_WINDOW as usize + 1)),
            cached: Mutex::new(None),
        }
    }

    /// The group these metrics belong to.
    pub fn group(&self) -> &GroupKey {
        &self.group
    }

    /// The live window configuration.
    pub fn properties(&self) -> &MetricsProperties {
        &self.properties
    }

    /// Counts one successful operation at the current instant.
    pub fn mark_success(&self) {
        self.record(false);
    }

    /// Counts one failed operation at the current instant.
    pub fn mark_failure(&self) {
        self.record(true);
    }

    /// Returns the counts for the window ending now.
    ///
    /// A snapshot younger than the configured TTL is returned as-is, so
    /// recent marks may not be reflected yet.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = Instant::now();
        let ttl = self.properties.snapshot_ttl();

        let mut cached = self.cached.lock();
        if let Some(c) = *cached {
            if now.saturating_duration_since(c.taken) < ttl {
                return c.snapshot;
            }
        }

        let snapshot = self.compute(now);
        *cached = Some(CachedSnapshot {
            taken: now,
            snapshot,
        });
        snapshot
    }

    /// Clears all counts and the cached snapshot.
    pub fn reset(&self) {
        self.buckets.lock().clear();
        *self.cached.lock() = None;

        #[cfg(feature = "tracing")]
        tracing::debug!(group = %self.group, "metrics window reset");
    }

    fn record(&self, failure: bool) {
        let now = Instant::now();
        let window = self.properties.window();
        let width = bucket_width(window);

        let mut buckets = self.buckets.lock();
        evict(&mut buckets, now, window);

        let needs_bucket = match buckets.back() {
            Some(bucket) => now.saturating_duration_since(bucket.start) >= width,
            None => true,
        };
        if needs_bucket {
            buckets.push_back(Bucket {
                start: now,
                successes: 0,
                failures: 0,
            });
        }

        if let Some(bucket) = buckets.back_mut() {
            if failure {
                bucket.failures += 1;
            } else {
                bucket.successes += 1;
            }
        }
    }

    fn compute(&self, now: Instant) -> MetricsSnapshot {
        let window = self.properties.window();
        let mut buckets = self.buckets.lock();
        evict(&mut buckets, now, window);

        let (successes, failures) = buckets
            .iter()
            .fold((0u64, 0u64), |(s, f), b| (s + b.successes, f + b.failures));
        MetricsSnapshot::from_counts(successes, failures)
    }
}

impl fmt::Debug for CommandMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMetrics")
            .field("group", &self.group)
            .field("buckets", &self.buckets.lock().len())
            .finish()
    }
}

fn bucket_width(window: Duration) -> Duration {
    (window / BUCKETS_PER_WINDOW).max(MIN_BUCKET_WIDTH)
}

fn evict(buckets: &mut VecDeque<Bucket>, now: Instant, window: Duration) {
    while let Some(oldest) = buckets.front() {
        if now.saturating_duration_since(oldest.start) >= window {
            buckets.pop_front();
        } else {
            break;
        }
    }
}
