//! Error responses.
//!
//! Three outcomes exist at the HTTP boundary: success, a handled client
//! error (plain text 4xx), and an unhandled failure (generic 500). The one
//! exception is an upstream completion failure, which answers with a JSON
//! `{error}` body to match the wire contract of `/ask`.

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use kiosk_core::Error;

/// An error that can be rendered as an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// 400: the client sent something unusable.
    BadRequest(String),
    /// 404: the requested resource does not exist.
    NotFound(String),
    /// 429: the client exceeded its request budget.
    RateLimited {
        /// How long until the current window resets.
        retry_after: Duration,
    },
    /// 500: the upstream completion call failed.
    Upstream(String),
    /// 500: anything else. The message is logged, never sent to the client.
    Internal(String),
}

/// JSON error body used by `/ask`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidParameter { .. } | Error::DivisionByZero => {
                Self::BadRequest(err.to_string())
            }
            Error::UnsafeFileName { .. } => Self::BadRequest(err.to_string()),
            Error::FileNotFound { .. } => Self::NotFound(err.to_string()),
            Error::Upstream { status, message } => {
                tracing::error!(?status, %message, "Upstream completion call failed");
                Self::Upstream("Failed to communicate with the completion API".to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            Self::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.as_secs().to_string())],
                "Too many requests, please try again later",
            )
                .into_response(),
            Self::Upstream(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody { error: message }),
            )
                .into_response(),
            Self::Internal(message) => {
                tracing::error!(%message, "Unhandled server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
