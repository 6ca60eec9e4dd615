//! Timeout resolution.
//!
//! The effective timeout of an invocation is the first of:
//!
//! 1. the per-invocation override ([`TimeoutOverride`]), which may also
//!    disable the timeout outright
//! 2. `command.<name>.Timeout` in milliseconds, if positive
//! 3. the command's own default
//! 4. [`DEFAULT_TIMEOUT`]
//!
//! Setting `ignoreTimeouts` to `true` disables every inherited timeout. An
//! explicit [`TimeoutOverride::Fixed`] still applies.
//! Zero or negative configured values count as "not configured", not as
//! "no timeout".

use crate::command::Command;
use bulwark_core::ConfigSource;
use std::time::Duration;

/// Timeout applied when nothing else specifies one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Process-wide switch that disables timeout enforcement.
pub const IGNORE_TIMEOUTS_KEY: &str = "ignoreTimeouts";

/// Per-invocation timeout choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutOverride {
    /// Resolve from configuration and the command's default.
    #[default]
    Inherit,
    /// Use this timeout regardless of configuration.
    Fixed(Duration),
    /// Run without a timeout.
    Disabled,
}

/// Configuration key holding the timeout for the command named `name`.
pub fn timeout_key(name: &str) -> String {
    format!("command.{name}.Timeout")
}

/// Resolves the timeout for one invocation of `command`.
pub(crate) fn effective_timeout<T>(
    config: &dyn ConfigSource,
    command: &Command<T>,
    requested: TimeoutOverride,
) -> Option<Duration> {
    match requested {
        TimeoutOverride::Disabled => None,
        TimeoutOverride::Fixed(timeout) => Some(timeout),
        TimeoutOverride::Inherit if config.value_or(IGNORE_TIMEOUTS_KEY, false) => None,
        TimeoutOverride::Inherit => Some(
            config
                .value::<i64>(&timeout_key(command.name()))
                .filter(|millis| *millis > 0)
                .map(|millis| Duration::from_millis(millis as u64))
                .or(command.default_timeout())
                .unwrap_or(DEFAULT_TIMEOUT),
        ),
    }
}
