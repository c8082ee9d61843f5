//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure a request can run into, from a missing bearer token to an unreachable
//! store, is one of its variants.
//!
//! `AppError` implements `actix_web::error::ResponseError`, so returning it from a handler
//! (or from the auth middleware) produces the same [`ApiResponse`] envelope that successful
//! calls use. Server-side failures are logged with their detail and answered with a
//! generic message.
//!
//! `From` implementations exist for `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, `bcrypt::BcryptError` and the tokio error types the
//! services run into, allowing for easy conversion using the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::{json, Value};
use std::fmt;
use validator::ValidationErrors;

use crate::response::ApiResponse;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed, invalid or expired credentials (HTTP 401).
    Unauthorized(String),
    /// A malformed request: bad identity, bad body, bad query parameter (HTTP 400).
    BadRequest(String),
    /// The caller is authenticated but does not own the resource (HTTP 403).
    Forbidden(String),
    /// Represents a situation where a requested resource was not found (HTTP 404).
    NotFound(String),
    /// A username or email that is already taken (HTTP 409).
    Conflict(String),
    /// Failed declarative field validation (HTTP 400).
    /// Carries one `"<field> failed on <rule>"` entry per violated rule.
    ValidationError(Vec<String>),
    /// The store could not be reached in time (HTTP 503).
    ServiceUnavailable(String),
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Represents an error originating from database operations (HTTP 500).
    DatabaseError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ValidationError(fields) => {
                write!(f, "Validation Error: {}", fields.join(", "))
            }
            AppError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into enveloped `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (body, message): (Value, String) = match self {
            AppError::ValidationError(fields) => (json!(fields), "Inputs invalid".into()),
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => (json!(""), msg.clone()),
            // Server-side detail stays in the log.
            AppError::ServiceUnavailable(_) => {
                log::warn!("{}", self);
                (
                    json!(""),
                    "Service temporarily unavailable, please try again later".into(),
                )
            }
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                log::error!("{}", self);
                (json!(""), "Error in server, please try again later".into())
            }
        };

        ApiResponse::new(status, body, message).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// Unique-constraint violations become `Conflict` naming the taken field. A
/// foreign-key violation can only come from a task whose owner was deleted, so
/// it becomes `Unauthorized`. Pool and connection failures become
/// `ServiceUnavailable`, everything else is a `DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                let message = match db.constraint() {
                    Some("users_email_key") => "Email already exists",
                    Some("users_username_key") => "Username already exists",
                    _ => "Resource already exists",
                };
                AppError::Conflict(message.into())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                account_gone()
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::ServiceUnavailable(error.to_string())
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

/// The caller's token is still valid but their account has been deleted.
pub fn account_gone() -> AppError {
    AppError::Unauthorized("Account no longer exists".into())
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// Entries are sorted so responses are stable across runs.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(move |err| format!("{} failed on {}", field, err.code))
            })
            .collect();
        fields.sort();
        AppError::ValidationError(fields)
    }
}

/// Converts `jsonwebtoken::errors::Error` into `AppError::Unauthorized`.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(format!("Invalid token: {}", error))
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> AppError {
        AppError::InternalServerError(format!("Background task failed: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> AppError {
        AppError::ServiceUnavailable("Store call timed out".into())
    }
}
