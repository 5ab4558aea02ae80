//! Response construction shared by handlers and middleware.
//!
//! # Responsibilities
//! - Uniform JSON error envelope for every rejection
//! - JSON success bodies with the `Accept: application/json` hint
//!
//! # Design Decisions
//! - The message defaults to the canonical reason phrase of the status
//! - Serialization failures of success bodies degrade to a 500 envelope

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error envelope: `{"error": {"code": 400, "message": "..."}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Build an error response with the JSON envelope.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let mut message = message.into();
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or_default().to_string();
    }
    let body = ErrorBody {
        error: ErrorDetail {
            code: status.as_u16(),
            message,
        },
    };
    with_accept_json((status, Json(body)).into_response())
}

/// Serialize `body` as a `200 OK` JSON response.
pub fn json_response<T: Serialize>(body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_accept_json(
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                bytes,
            )
                .into_response(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}

fn with_accept_json(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    response
}
