//! Logging for instrumented calls.
//!
//! The [`Logger`] is an explicitly constructed handle that is passed to
//! whatever needs to log, instead of a process-wide singleton. Lines are
//! rendered by [`format::ColoredFormat`] as
//! `timestamp - logger_name - LEVEL - message`, colorized by severity.
//! [`crate::tracing::init_tracing`] configures the process-wide subscriber for
//! binaries.

pub mod format;
mod logger;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tracing;

pub use logger::*;
