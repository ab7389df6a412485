//! Instrumented calls.
//!
//! An [`Instrumentation`] wraps ordinary functions and future-returning
//! functions so that every invocation is timed and logged, every failure is
//! logged with a backtrace and normalized by a [`FailureReporter`], and an
//! optional [`MemoryReclaimer`] runs once the call is over.
//!
//! ```
//! use callguard::{HttpReporter, Instrumentation};
//! use callguard_telemetry::Logger;
//! use callguard_config::shared::LogLevel;
//!
//! let instrumentation = Instrumentation::new(Logger::console("api", LogLevel::Info), HttpReporter);
//! let divide = instrumentation.wrap("divide", |(a, b): (i64, i64)| {
//!     a.checked_div(b).ok_or("division by zero")
//! });
//!
//! assert_eq!(divide.call((6, 3)).unwrap(), 2);
//! assert_eq!(divide.call((1, 0)).unwrap_err().to_string(), "500: division by zero");
//! ```

mod error;
mod instrument;
mod reclaim;
mod reporter;
#[cfg(feature = "actix")]
mod web;

pub use error::*;
pub use instrument::*;
pub use reclaim::*;
pub use reporter::*;
