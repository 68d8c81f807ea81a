//! API error types shared by the HTTP and GraphQL surfaces.

use crate::modules::counters::use_cases::next_counter_value::handler::EngineError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Errors as the caller gets to see them.
///
/// Only input problems carry detail; backend failures are reported
/// generically and their cause goes to the log instead.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("counter is under heavy contention, retry the request")]
    ContentionExceeded,

    #[error("counter store is unavailable")]
    StoreUnavailable,

    #[error("request was cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::ContentionExceeded => "contention_exceeded",
            Self::StoreUnavailable => "store_unavailable",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ContentionExceeded => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreUnavailable | Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::InvalidArgument(message) => Self::BadRequest(message),
            EngineError::ContentionExceeded { attempts } => {
                tracing::error!(attempts, "Counter update gave up under contention");
                Self::ContentionExceeded
            }
            EngineError::StoreUnavailable(reason) => {
                tracing::error!(%reason, "Counter store failure");
                Self::StoreUnavailable
            }
            EngineError::Cancelled => Self::Cancelled,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
