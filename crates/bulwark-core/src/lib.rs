//! Core infrastructure for bulwark.
//!
//! This crate provides the pieces shared by every isolation component:
//! - [`GroupKey`], the interned name of an isolation domain
//! - [`ConfigSource`], the hot-reloadable key/value configuration seam
//! - The event system ([`EventListeners`], [`IsolationEvent`]) that acts as
//!   the fire-and-forget metric sink
//! - [`BoxError`], the error type work functions return

pub mod config;
pub mod error;
pub mod events;
pub mod group_key;
pub mod isolation_event;
#[cfg(feature = "metrics")]
pub mod recorder;

pub use config::{ConfigChange, ConfigListener, ConfigSource, MemoryConfig, SharedConfig};
pub use error::{BoxError, ConfigError};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use group_key::GroupKey;
pub use isolation_event::{CommandStatus, EventSink, IsolationEvent, OnFailure};
#[cfg(feature = "metrics")]
pub use recorder::MetricsRecorderListener;
