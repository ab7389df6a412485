use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status code given to failures nobody classified.
pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// Failure classification.
///
/// An error that already knows its status code is considered classified and
/// is handed back to the caller untouched. Every other error is unclassified
/// and gets converted by the [`FailureReporter`](crate::FailureReporter).
///
/// Implement it for your own error types; the default says "unclassified".
pub trait Classify: fmt::Display {
    fn status_code(&self) -> Option<u16> {
        None
    }
}

/// Framework-style error: a status code and a human readable detail.
///
/// Displays as `"{status_code}: {detail}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{status_code}: {detail}")]
pub struct HttpError {
    pub status_code: u16,
    pub detail: String,
}

impl HttpError {
    /// An error answering `status_code` with `detail` as the body.
    pub fn new(status_code: u16, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            detail: detail.into(),
        }
    }

    /// A 500 carrying `detail`.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(INTERNAL_SERVER_ERROR, detail)
    }
}

impl Classify for HttpError {
    fn status_code(&self) -> Option<u16> {
        Some(self.status_code)
    }
}

/// Plain failure mapping, serialized as `{"status_code": 500, "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub status_code: u16,
    pub message: String,
}

impl ErrorPayload {
    /// A 500 mapping carrying `message`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status_code: INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status_code, self.message)
    }
}

impl Classify for ErrorPayload {
    fn status_code(&self) -> Option<u16> {
        Some(self.status_code)
    }
}

/// An unclassified failure, reduced to its string form.
///
/// Returned errors and panics end up here alike; reporters only ever see the
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unhandled {
    message: String,
}

impl Unhandled {
    /// Takes the `Display` form of an error the callable returned.
    pub fn from_error(error: &impl fmt::Display) -> Self {
        Self {
            message: error.to_string(),
        }
    }

    /// Takes the message of a panic payload.
    pub fn from_panic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Consumes the failure, returning its message.
    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for Unhandled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Classify for &'static str {}

impl Classify for String {}

impl Classify for fmt::Error {}

impl Classify for std::io::Error {}

impl Classify for Unhandled {}

/// Classified when the boxed error is an [`HttpError`].
impl Classify for Box<dyn Error + Send + Sync> {
    fn status_code(&self) -> Option<u16> {
        self.downcast_ref::<HttpError>()
            .map(|error| error.status_code)
    }
}

/// Classified when the error, or any error in its chain, is an [`HttpError`].
impl Classify for anyhow::Error {
    fn status_code(&self) -> Option<u16> {
        self.chain()
            .find_map(|cause| cause.downcast_ref::<HttpError>())
            .map(|error| error.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_status_and_detail() {
        let error = HttpError::new(404, "missing");

        assert_eq!(error.to_string(), "404: missing");
        assert_eq!(Classify::status_code(&error), Some(404));
    }

    #[test]
    fn payload_serializes_as_plain_mapping() {
        let payload = ErrorPayload::internal("bad");

        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json, serde_json::json!({"status_code": 500, "message": "bad"}));
    }

    #[test]
    fn plain_errors_are_unclassified() {
        assert_eq!("bad".status_code(), None);
        assert_eq!(String::from("bad").status_code(), None);
        assert_eq!(std::io::Error::other("bad").status_code(), None);
    }

    #[test]
    fn boxed_http_errors_are_classified() {
        let boxed: Box<dyn Error + Send + Sync> = Box::new(HttpError::new(409, "conflict"));
        let plain: Box<dyn Error + Send + Sync> = Box::new(std::io::Error::other("bad"));

        assert_eq!(boxed.status_code(), Some(409));
        assert_eq!(plain.status_code(), None);
    }

    #[test]
    fn anyhow_classification_follows_the_chain() {
        let wrapped = anyhow::Error::new(HttpError::new(403, "denied")).context("loading user");
        let plain = anyhow::anyhow!("bad");

        assert_eq!(wrapped.status_code(), Some(403));
        assert_eq!(plain.status_code(), None);
    }

    #[test]
    fn unhandled_keeps_the_message() {
        let from_error = Unhandled::from_error(&std::io::Error::other("disk full"));
        let from_panic = Unhandled::from_panic("boom");

        assert_eq!(from_error.to_string(), "disk full");
        assert_eq!(from_panic.into_message(), "boom");
    }
}
