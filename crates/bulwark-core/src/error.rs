//! Common error types for bulwark.

use thiserror::Error;

/// The error type work functions return.
///
/// Boxing keeps the original error intact so the pipeline can hand it back
/// unchanged and callers can downcast to their own types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A value was present but could not be parsed into the expected type.
    #[error("value {value:?} for key '{key}' is not a valid {expected}")]
    Unparsable {
        /// The configuration key.
        key: String,
        /// The raw value found.
        value: String,
        /// The Rust type the value was parsed as.
        expected: &'static str,
    },
}
