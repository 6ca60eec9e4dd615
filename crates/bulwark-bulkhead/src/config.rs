//! Bulkhead capacity configuration.

use bulwark_core::{GroupKey, SharedConfig};

/// Default for `bulkhead.<group>.maxConcurrent`.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

pub(crate) const BULKHEAD_SECTION: &str = "bulkhead";
pub(crate) const MAX_CONCURRENT: &str = "maxConcurrent";

/// Reads `bulkhead.<group>.maxConcurrent`, falling back to
/// `bulkhead.default.maxConcurrent` and then [`DEFAULT_MAX_CONCURRENT`].
pub fn max_concurrent(config: &SharedConfig, group: &GroupKey) -> usize {
    config.group_value(BULKHEAD_SECTION, group, MAX_CONCURRENT, DEFAULT_MAX_CONCURRENT)
}

/// Returns `true` if `group` has its own `maxConcurrent` entry rather than
/// inheriting the section default.
pub(crate) fn has_own_capacity(config: &SharedConfig, group: &GroupKey) -> bool {
    config
        .value::<usize>(&bulwark_core::config::group_setting_key(
            BULKHEAD_SECTION,
            group.name(),
            MAX_CONCURRENT,
        ))
        .is_some()
}
