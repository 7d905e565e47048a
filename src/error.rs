//! Error types for the post API
//!
//! `ApiError` is the HTTP-facing taxonomy; every variant renders as a problem
//! document (`application/problem+json`). The exception boundary adds the
//! request context (`instance`, `requestId`) on the way out.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::validation::ValidationErrors;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Message returned to clients for any unhandled fault.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred!";

// == Problem Document ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            kind: problem_type(status).to_string(),
            title: title.into(),
            status: status.as_u16(),
            instance: None,
            request_id: None,
            errors: None,
        }
    }

    /// A problem titled with the status' canonical reason.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("Error"))
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// RFC reference used as the problem `type` for a status.
pub fn problem_type(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "https://tools.ietf.org/html/rfc9110#section-15.5.1",
        401 => "https://tools.ietf.org/html/rfc9110#section-15.5.2",
        403 => "https://tools.ietf.org/html/rfc9110#section-15.5.4",
        404 => "https://tools.ietf.org/html/rfc9110#section-15.5.5",
        405 => "https://tools.ietf.org/html/rfc9110#section-15.5.6",
        415 => "https://tools.ietf.org/html/rfc9110#section-15.5.16",
        422 => "https://tools.ietf.org/html/rfc9110#section-15.5.21",
        429 => "https://tools.ietf.org/html/rfc6585#section-4",
        500 => "https://tools.ietf.org/html/rfc9110#section-15.6.1",
        503 => "https://tools.ietf.org/html/rfc9110#section-15.6.4",
        _ => "about:blank",
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(&self)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response.extensions_mut().insert(self);
        response
    }
}

/// Marks a response produced by an unhandled fault. Holds the full detail
/// for the server log; clients never see it.
#[derive(Debug, Clone)]
pub struct Fault(pub String);

// == Api Error Enum ==
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request payload failed its validation rules
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// Anti-forgery token missing or not bound to the session
    #[error("Invalid anti-forgery token")]
    AntiForgery { token_received: String },

    /// No permit available under the named policy
    #[error("Rate limit exceeded by policy {policy}")]
    RateLimited { policy: String },

    #[error("Not found")]
    NotFound,

    /// Body or parameters could not be read
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Anything unexpected
    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::AntiForgery { .. } | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_problem(&self) -> Problem {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => Problem::new(status, "Validation error(s)")
                .with_errors(serde_json::to_value(errors).unwrap_or(Value::Null)),
            ApiError::AntiForgery { token_received } => Problem::from_status(status).with_errors(
                json!({
                    "message": "Invalid anti-forgery token.",
                    "tokenReceived": token_received,
                }),
            ),
            ApiError::RateLimited { policy } => Problem::from_status(status).with_errors(json!({
                "message": "Too many requests. Please try again later.",
                "policy": policy,
            })),
            ApiError::NotFound => Problem::from_status(status),
            ApiError::BadRequest(message) => {
                Problem::from_status(status).with_errors(json!({ "message": message }))
            }
            ApiError::Unhandled(_) => Problem::new(status, UNEXPECTED_ERROR)
                .with_errors(json!({ "message": UNEXPECTED_ERROR })),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.to_problem().into_response();
        if let ApiError::Unhandled(err) = &self {
            response
                .extensions_mut()
                .insert(Fault(format!("{err:#}")));
        }
        response
    }
}

// == Result Type Alias ==
pub type Result<T> = std::result::Result<T, ApiError>;
