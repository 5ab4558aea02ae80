//! API rejection taxonomy and its HTTP mapping.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::address::AddressError;
use crate::gateway::GatewayError;
use crate::http::response::error_response;

/// Every way an API request can fail.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request method: {method}")]
    MethodNotAllowed {
        method: Method,
        allowed: &'static [Method],
    },

    #[error("Unsupported media type, expected application/json")]
    UnsupportedMediaType,

    #[error("Invalid json request body: {0}")]
    InvalidJson(String),

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Missing skyaddr")]
    MissingAddress,

    #[error("Invalid skycoin address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Event starts at {0}")]
    NotStarted(DateTime<Utc>),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InvalidJson(_)
            | ApiError::InvalidQuery(_)
            | ApiError::MissingAddress
            | ApiError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            ApiError::NotStarted(_) => StatusCode::FORBIDDEN,
            ApiError::Gateway(GatewayError::Timeout) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Gateway(GatewayError::Business(_)) => StatusCode::BAD_REQUEST,
            ApiError::Gateway(GatewayError::Transport(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            // Reason phrase only.
            ApiError::Gateway(GatewayError::Timeout) => String::new(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = error_response(status, self.message());

        if let ApiError::MethodNotAllowed { allowed, .. } = &self {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }

        response
    }
}
