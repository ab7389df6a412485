use std::fmt;

use serde::Serialize;

use crate::error::{Classify, ErrorPayload, HttpError, Unhandled};

/// Decides what callers of an instrumented function get back.
///
/// The wrapper hands the reporter exactly one of: the successful value, an
/// error that was already classified, or an unclassified failure. The output
/// type is picked by the implementation, which is how the framework and the
/// plain-mapping conventions coexist.
pub trait FailureReporter: Send + Sync + 'static {
    /// What an instrumented call returns for a callable producing `Result<T, E>`.
    type Output<T, E>;

    /// Wraps the value of a call that succeeded.
    fn success<T, E>(&self, value: T) -> Self::Output<T, E>;

    /// Returns `error` to the caller untouched.
    fn classified<T, E>(&self, error: E) -> Self::Output<T, E>;

    /// Converts a failure that carried no status code, panics included.
    fn unclassified<T, E>(&self, failure: Unhandled) -> Self::Output<T, E>;
}

/// Reports unclassified failures as a 500 [`HttpError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpReporter;

impl FailureReporter for HttpReporter {
    type Output<T, E> = Result<T, Raised<E>>;

    fn success<T, E>(&self, value: T) -> Self::Output<T, E> {
        Ok(value)
    }

    fn classified<T, E>(&self, error: E) -> Self::Output<T, E> {
        Err(Raised::Classified(error))
    }

    fn unclassified<T, E>(&self, failure: Unhandled) -> Self::Output<T, E> {
        Err(Raised::Http(HttpError::internal(failure.into_message())))
    }
}

/// Error returned by calls instrumented with [`HttpReporter`].
#[derive(Debug)]
pub enum Raised<E> {
    /// The callable's own error, which already carried a status code.
    Classified(E),
    /// The framework error built from an unclassified failure.
    Http(HttpError),
}

impl<E> Raised<E> {
    /// The framework error, if the failure was unclassified.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            Raised::Http(error) => Some(error),
            Raised::Classified(_) => None,
        }
    }

    /// The callable's own error, if it was classified.
    pub fn into_classified(self) -> Option<E> {
        match self {
            Raised::Classified(error) => Some(error),
            Raised::Http(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Raised<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Raised::Classified(error) => error.fmt(f),
            Raised::Http(error) => error.fmt(f),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Raised<E> {}

impl<E: Classify> Classify for Raised<E> {
    fn status_code(&self) -> Option<u16> {
        match self {
            Raised::Classified(error) => error.status_code(),
            Raised::Http(error) => Some(error.status_code),
        }
    }
}

/// Reports unclassified failures as an [`ErrorPayload`] value instead of an
/// error. Classified errors are still returned as errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadReporter;

impl FailureReporter for PayloadReporter {
    type Output<T, E> = Result<Reply<T>, E>;

    fn success<T, E>(&self, value: T) -> Self::Output<T, E> {
        Ok(Reply::Value(value))
    }

    fn classified<T, E>(&self, error: E) -> Self::Output<T, E> {
        Err(error)
    }

    fn unclassified<T, E>(&self, failure: Unhandled) -> Self::Output<T, E> {
        Ok(Reply::Failure(ErrorPayload::internal(failure.into_message())))
    }
}

/// Either the callable's value or the failure mapping standing in for it.
///
/// Serializes untagged, so a reply is indistinguishable on the wire from the
/// value or the mapping it holds. Callers detect failure by looking for
/// `status_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Value(T),
    Failure(ErrorPayload),
}

impl<T> Reply<T> {
    /// Returns `true` if the call failed and this holds the failure mapping.
    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Failure(_))
    }

    /// The successful value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Reply::Value(value) => Some(value),
            Reply::Failure(_) => None,
        }
    }

    /// Converts into a `Result`, the failure mapping becoming the error.
    pub fn into_result(self) -> Result<T, ErrorPayload> {
        match self {
            Reply::Value(value) => Ok(value),
            Reply::Failure(payload) => Err(payload),
        }
    }
}
