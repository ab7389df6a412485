use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::{LoggerConfig, ReporterKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("the logger name must not be empty")]
    EmptyLoggerName,
}

/// Top level configuration of an instrumentation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GuardConfig {
    pub logger: LoggerConfig,
    pub reporter: ReporterKind,
    /// Run the configured memory reclaimer after every call.
    pub reclaim_memory: bool,
}

impl GuardConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.logger.name.trim().is_empty() {
            return Err(ValidationError::EmptyLoggerName);
        }

        Ok(())
    }
}
