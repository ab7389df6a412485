use serde::{Deserialize, Serialize};

/// How unclassified failures are surfaced to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReporterKind {
    /// Failures become a framework error with status 500.
    #[default]
    Http,
    /// Failures become a plain `{status_code, message}` value.
    Payload,
}
