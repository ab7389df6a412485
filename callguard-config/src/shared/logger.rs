use std::fmt;

use serde::{Deserialize, Serialize};

/// Logger name used when none is configured.
pub const DEFAULT_LOGGER_NAME: &str = "callguard";

/// Severity threshold of a logger.
///
/// `Critical` sits above `Error`: it is emitted at error level and flagged so
/// the console format can tell the two apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Console logger settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggerConfig {
    /// Name printed in every line, between the timestamp and the level.
    pub name: String,
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Whether lines are colorized with ANSI escapes.
    pub ansi: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOGGER_NAME.to_string(),
            level: LogLevel::Info,
            ansi: true,
        }
    }
}
