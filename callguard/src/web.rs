use std::fmt;

use actix_web::body::BoxBody;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, ResponseError};
use serde::Serialize;

use crate::error::{Classify, HttpError, INTERNAL_SERVER_ERROR};
use crate::reporter::{Raised, Reply};

/// Body of framework error responses.
#[derive(Debug, Serialize)]
struct DetailBody<'a> {
    detail: &'a str,
}

/// Falls back to 500 for codes actix does not accept.
fn to_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl ResponseError for HttpError {
    fn status_code(&self) -> StatusCode {
        to_status(self.status_code)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self)).json(DetailBody {
            detail: &self.detail,
        })
    }
}

impl<E> ResponseError for Raised<E>
where
    E: Classify + fmt::Debug,
{
    fn status_code(&self) -> StatusCode {
        to_status(Classify::status_code(self).unwrap_or(INTERNAL_SERVER_ERROR))
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Raised::Http(error) => error.error_response(),
            Raised::Classified(error) => {
                let detail = error.to_string();
                HttpResponse::build(ResponseError::status_code(self))
                    .json(DetailBody { detail: &detail })
            }
        }
    }
}

/// Values answer 200 with their JSON, failures answer with the payload status.
impl<T> Responder for Reply<T>
where
    T: Serialize,
{
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        match self {
            Reply::Value(value) => HttpResponse::Ok().json(value),
            Reply::Failure(payload) => {
                HttpResponse::build(to_status(payload.status_code)).json(payload)
            }
        }
    }
}

/// Classified by the status of the response it would render.
impl Classify for actix_web::Error {
    fn status_code(&self) -> Option<u16> {
        Some(self.as_response_error().status_code().as_u16())
    }
}
