//! Deciding which errors count against a breaker.
//!
//! Some errors say nothing about the health of the dependency behind a
//! breaker: a validation failure, a "not found", a business rule violation.
//! Registering those types with [`IgnoredErrors`] makes the breaker invoker
//! count them as successes while still handing them back to the caller.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

type Matcher = Arc<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;

/// Set of error kinds a breaker treats as successes.
///
/// # Example
///
/// ```rust
/// use bulwark_circuitbreaker::IgnoredErrors;
/// use std::fmt;
///
/// #[derive(Debug)]
/// struct NotFound;
/// impl fmt::Display for NotFound {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         f.write_str("not found")
///     }
/// }
/// impl std::error::Error for NotFound {}
///
/// let ignored = IgnoredErrors::new().ignore::<NotFound>();
/// assert!(ignored.is_ignored(&NotFound));
/// assert!(!ignored.is_ignored(&std::io::Error::other("disk")));
/// ```
#[derive(Clone, Default)]
pub struct IgnoredErrors {
    matchers: Vec<(&'static str, Matcher)>,
}

impl IgnoredErrors {
    /// Creates an empty set; every error counts as a failure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores errors whose concrete type is `E`.
    pub fn ignore<E>(mut self) -> Self
    where
        E: Error + 'static,
    {
        self.matchers.push((
            std::any::type_name::<E>(),
            Arc::new(|error: &(dyn Error + 'static)| error.is::<E>()),
        ));
        self
    }

    /// Ignores errors matching `predicate`.
    ///
    /// `name` only appears in `Debug` output.
    pub fn ignore_if<F>(mut self, name: &'static str, predicate: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.matchers.push((name, Arc::new(predicate)));
        self
    }

    /// Returns `true` if `error` should be counted as a success.
    pub fn is_ignored(&self, error: &(dyn Error + 'static)) -> bool {
        self.matchers.iter().any(|(_, matches)| matches(error))
    }

    /// Returns `true` if nothing is ignored.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl fmt::Debug for IgnoredErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.matchers.iter().map(|(name, _)| name))
            .finish()
    }
}
