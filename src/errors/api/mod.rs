use chrono::Utc;
use poem_openapi::{ApiResponse, payload::Json};
use std::error::Error as _;

use crate::config::RuntimeEnvironment;
use crate::errors::internal::{AccessError, InternalError, RequestError};
use crate::types::dto::common::{ErrorEnvelope, FieldErrorDto};

/// Message returned for unexpected failures when details are suppressed
const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

/// API-facing error type shared by every endpoint
///
/// Each variant carries the `{status:"error", message, statusCode, timestamp}`
/// envelope; `Validation` additionally lists the rejected fields.
#[derive(ApiResponse, Debug)]
#[oai(bad_request_handler = "payload_rejected")]
pub enum ApiError {
    /// Malformed input or violated business constraint
    #[oai(status = 400)]
    BadRequest(Json<ErrorEnvelope>),

    /// Missing, invalid or expired token; rejected credentials
    #[oai(status = 401)]
    Unauthorized(Json<ErrorEnvelope>),

    /// Authenticated but not allowed
    #[oai(status = 403)]
    Forbidden(Json<ErrorEnvelope>),

    /// Referenced entity does not exist
    #[oai(status = 404)]
    NotFound(Json<ErrorEnvelope>),

    /// Unique constraint lost to a concurrent writer
    #[oai(status = 409)]
    Conflict(Json<ErrorEnvelope>),

    /// Payload shape violations with a field-level error list
    #[oai(status = 422)]
    Validation(Json<ErrorEnvelope>),

    /// Unexpected failure
    #[oai(status = 500)]
    Internal(Json<ErrorEnvelope>),
}

fn envelope(message: impl Into<String>, status_code: u16) -> Json<ErrorEnvelope> {
    Json(ErrorEnvelope {
        status: "error".to_string(),
        message: message.into(),
        status_code,
        timestamp: Utc::now().to_rfc3339(),
        errors: None,
    })
}

/// Request bodies poem-openapi could not parse (bad JSON, unknown fields, wrong types)
fn payload_rejected(err: poem::Error) -> ApiError {
    let mut body = envelope("Validation Error", 422);
    body.0.errors = Some(vec![FieldErrorDto {
        field: "body".to_string(),
        message: err.to_string(),
    }]);
    ApiError::Validation(body)
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(envelope(message, 400))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(envelope(message, 401))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(envelope(message, 403))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(envelope(message, 404))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(envelope(message, 409))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(envelope(message, 500))
    }

    pub fn body(&self) -> &ErrorEnvelope {
        match self {
            ApiError::BadRequest(json)
            | ApiError::Unauthorized(json)
            | ApiError::Forbidden(json)
            | ApiError::NotFound(json)
            | ApiError::Conflict(json)
            | ApiError::Validation(json)
            | ApiError::Internal(json) => &json.0,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.body().status_code
    }

    pub fn message(&self) -> &str {
        &self.body().message
    }

    /// Convert InternalError to ApiError
    ///
    /// This is the explicit conversion point from internal errors to API errors.
    /// Domain errors keep their message. Anything else is logged with full
    /// context and answered with a generic 500; the underlying detail is only
    /// included outside production.
    pub fn from_internal_error(err: InternalError, environment: RuntimeEnvironment) -> Self {
        match &err {
            InternalError::Credential(e) => {
                tracing::debug!("Credential rejection: {}", e);
                Self::unauthorized(e.to_string())
            }
            InternalError::Token(e) => {
                tracing::debug!("Token rejection: {}", e);
                Self::unauthorized(e.to_string())
            }
            InternalError::Access(AccessError::Unauthenticated) => {
                Self::unauthorized(AccessError::Unauthenticated.to_string())
            }
            InternalError::Access(e) => {
                tracing::warn!("Access denied: {}", e);
                Self::forbidden(e.to_string())
            }
            InternalError::Resource(e) => Self::not_found(e.to_string()),
            InternalError::Request(RequestError::Conflict) => {
                Self::conflict(RequestError::Conflict.to_string())
            }
            InternalError::Request(e) => Self::bad_request(e.to_string()),
            InternalError::Validation(e) => {
                let mut body = envelope(e.to_string(), 422);
                body.0.errors = Some(
                    e.violations
                        .iter()
                        .map(|v| FieldErrorDto {
                            field: v.field.clone(),
                            message: v.message.clone(),
                        })
                        .collect(),
                );
                ApiError::Validation(body)
            }
            InternalError::Database(_)
            | InternalError::Parse { .. }
            | InternalError::Crypto { .. }
            | InternalError::OperationFailed { .. } => {
                tracing::error!("Unexpected error: {}", describe(&err));
                if environment.exposes_error_details() {
                    Self::internal(describe(&err))
                } else {
                    Self::internal(GENERIC_INTERNAL_MESSAGE)
                }
            }
        }
    }
}

/// Render an error with its whole source chain
fn describe(err: &InternalError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
