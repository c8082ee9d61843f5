//! Response shapes shared by every endpoint.
//!
//! Successful and failed requests are both wrapped in [`ApiResponse`], so a
//! client can always read `code`, `status` and `message` without looking at
//! the HTTP status line. Task listings use [`Page`] as their body.

use actix_web::{http::StatusCode, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The uniform envelope: `{timestamp, body, code, status, message}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
    /// The payload; an empty string when there is nothing to return.
    pub body: T,
    /// Numeric HTTP status code, mirrored from the status line.
    pub code: u16,
    /// `true` for 2xx outcomes.
    pub status: bool,
    /// Human readable outcome.
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(code: StatusCode, body: T, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            body,
            code: code.as_u16(),
            status: code.is_success(),
            message: message.into(),
        }
    }

    /// 200 OK envelope.
    pub fn ok(body: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body, message)
    }

    /// 201 Created envelope.
    pub fn created(body: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, body, message)
    }

    /// Renders the envelope with the matching HTTP status line.
    pub fn into_response(self) -> HttpResponse {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::build(status).json(self)
    }
}

/// One page of a filtered listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the whole filtered set, not of this page.
    pub total: u64,
    pub page_index: u32,
    pub page_size: u32,
}
