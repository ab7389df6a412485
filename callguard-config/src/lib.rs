//! Configuration for instrumented calls.
//!
//! Provides runtime environment detection, layered configuration loading from
//! YAML files and environment variables, and the shared configuration types
//! consumed by the telemetry and wrapper crates.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
