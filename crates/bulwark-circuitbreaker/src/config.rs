//! Hot-reloadable breaker and metrics properties.
//!
//! Properties hold the shared configuration source and read it on every
//! access; nothing here caches a value.

use bulwark_core::{GroupKey, SharedConfig};
use std::fmt;
use std::time::Duration;

/// Default for `breaker.<group>.minimumOperations`.
pub const DEFAULT_MINIMUM_OPERATIONS: u64 = 10;
/// Default for `breaker.<group>.thresholdPercentage`.
pub const DEFAULT_THRESHOLD_PERCENTAGE: u32 = 50;
/// Default for `breaker.<group>.trippedDurationMillis`.
pub const DEFAULT_TRIPPED_DURATION_MILLIS: u64 = 10_000;
/// Default for `metrics.<group>.windowMillis`.
pub const DEFAULT_WINDOW_MILLIS: u64 = 30_000;
/// Default for `metrics.<group>.snapshotTtlMillis`.
pub const DEFAULT_SNAPSHOT_TTL_MILLIS: u64 = 1_000;

const BREAKER_SECTION: &str = "breaker";
const METRICS_SECTION: &str = "metrics";

/// Per-group breaker configuration.
///
/// | Key | Default |
/// |---|---|
/// | `breaker.<group>.minimumOperations` | 10 |
/// | `breaker.<group>.thresholdPercentage` | 50 |
/// | `breaker.<group>.trippedDurationMillis` | 10000 |
/// | `breaker.<group>.forceTripped` | false |
/// | `breaker.<group>.forceFixed` | false |
///
/// Each key falls back to `breaker.default.<name>` before the default above.
#[derive(Clone)]
pub struct BreakerProperties {
    config: SharedConfig,
    group: GroupKey,
}

impl BreakerProperties {
    /// Creates properties for `group` backed by `config`.
    pub fn new(config: SharedConfig, group: GroupKey) -> Self {
        Self { config, group }
    }

    /// Minimum operations in the window before the breaker may trip.
    pub fn minimum_operations(&self) -> u64 {
        self.read("minimumOperations", DEFAULT_MINIMUM_OPERATIONS)
    }

    /// Error percentage at or above which the breaker trips.
    pub fn threshold_percentage(&self) -> u32 {
        self.read("thresholdPercentage", DEFAULT_THRESHOLD_PERCENTAGE)
    }

    /// How long a tripped breaker waits before allowing a single test call.
    pub fn tripped_duration(&self) -> Duration {
        Duration::from_millis(self.read("trippedDurationMillis", DEFAULT_TRIPPED_DURATION_MILLIS))
    }

    /// Rejects every call while set, even if `force_fixed` is also set.
    pub fn force_tripped(&self) -> bool {
        self.read("forceTripped", false)
    }

    /// Allows every call while set, unless `force_tripped` is also set.
    pub fn force_fixed(&self) -> bool {
        self.read("forceFixed", false)
    }

    fn read<T: std::str::FromStr>(&self, name: &str, fallback: T) -> T {
        self.config
            .group_value(BREAKER_SECTION, &self.group, name, fallback)
    }
}

impl fmt::Debug for BreakerProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerProperties")
            .field("group", &self.group)
            .field("minimum_operations", &self.minimum_operations())
            .field("threshold_percentage", &self.threshold_percentage())
            .field("tripped_duration", &self.tripped_duration())
            .field("force_tripped", &self.force_tripped())
            .field("force_fixed", &self.force_fixed())
            .finish()
    }
}

/// Per-group metrics window configuration.
///
/// | Key | Default |
/// |---|---|
/// | `metrics.<group>.windowMillis` | 30000 |
/// | `metrics.<group>.snapshotTtlMillis` | 1000 |
#[derive(Clone)]
pub struct MetricsProperties {
    config: SharedConfig,
    group: GroupKey,
}

impl MetricsProperties {
    /// Creates properties for `group` backed by `config`.
    pub fn new(config: SharedConfig, group: GroupKey) -> Self {
        Self { config, group }
    }

    /// Length of the rolling window operations are counted in.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.config.group_value(
            METRICS_SECTION,
            &self.group,
            "windowMillis",
            DEFAULT_WINDOW_MILLIS,
        ))
    }

    /// How long a computed snapshot is reused before recomputing.
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_millis(self.config.group_value(
            METRICS_SECTION,
            &self.group,
            "snapshotTtlMillis",
            DEFAULT_SNAPSHOT_TTL_MILLIS,
        ))
    }
}

impl fmt::Debug for MetricsProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsProperties")
            .field("group", &self.group)
            .field("window", &self.window())
            .field("snapshot_ttl", &self.snapshot_ttl())
            .finish()
    }
}
