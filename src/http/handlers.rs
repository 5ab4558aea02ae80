//! API handlers for `/api/bind` and `/api/status`.
//!
//! Both run the same pipeline, short-circuiting on the first failure:
//! method → (bind: content type) → payload → address → readiness gate →
//! gateway call with deadline → result translation.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::gateway::{BindRequest, Gateway, GatewayError, GatewayReply, StatusRequest};
use crate::http::error::ApiError;
use crate::http::response::json_response;
use crate::observability::metrics;

pub const BIND_PATH: &str = "/api/bind";
pub const STATUS_PATH: &str = "/api/status";

const BIND_METHODS: &[Method] = &[Method::POST];
const STATUS_METHODS: &[Method] = &[Method::GET];

/// Dependencies of the API handlers, fixed at startup.
#[derive(Clone)]
pub struct ApiState {
    gateway: Arc<dyn Gateway>,
    start_at: Option<DateTime<Utc>>,
    request_timeout: Duration,
}

impl ApiState {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        start_at: Option<DateTime<Utc>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            start_at,
            request_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BindBody {
    #[serde(default)]
    skyaddr: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    skyaddr: String,
}

/// Binds a skycoin address to a deposit address.
///
/// Method: POST, Content-Type: application/json, body `{"skyaddr": "..."}`.
pub async fn bind_handler(
    State(state): State<ApiState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = bind(&state, &method, &headers, &body).await;
    finish(BIND_PATH, result)
}

/// Returns the deposit statuses of a skycoin address.
///
/// Method: GET, query `skyaddr`.
pub async fn status_handler(
    State(state): State<ApiState>,
    method: Method,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Response {
    let result = status(&state, &method, query).await;
    finish(STATUS_PATH, result)
}

async fn bind(
    state: &ApiState,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<impl Serialize, ApiError> {
    check_method(method, BIND_METHODS)?;
    check_json_content_type(headers)?;

    let req: BindBody =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;
    let skyaddr = verify_address(req.skyaddr)?;
    ready_to_start(state.start_at)?;

    tracing::info!(%skyaddr, "Sending BindRequest to gateway");
    call_gateway(
        state.request_timeout,
        state.gateway.bind_address(BindRequest { skyaddr }),
    )
    .await
}

async fn status(
    state: &ApiState,
    method: &Method,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<impl Serialize, ApiError> {
    check_method(method, STATUS_METHODS)?;

    let Query(query) = query.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;
    let skyaddr = verify_address(query.skyaddr)?;
    ready_to_start(state.start_at)?;

    tracing::info!(%skyaddr, "Sending StatusRequest to gateway");
    call_gateway(
        state.request_timeout,
        state.gateway.get_deposit_statuses(StatusRequest { skyaddr }),
    )
    .await
}

fn check_method(method: &Method, allowed: &'static [Method]) -> Result<(), ApiError> {
    if allowed.contains(method) {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed {
            method: method.clone(),
            allowed,
        })
    }
}

fn check_json_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"));

    if is_json {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType)
    }
}

fn verify_address(skyaddr: String) -> Result<String, ApiError> {
    if skyaddr.is_empty() {
        return Err(ApiError::MissingAddress);
    }
    if let Err(e) = Address::decode(&skyaddr) {
        tracing::warn!(%skyaddr, error = %e, "Invalid skycoin address");
        return Err(e.into());
    }
    Ok(skyaddr)
}

fn ready_to_start(start_at: Option<DateTime<Utc>>) -> Result<(), ApiError> {
    match start_at {
        Some(start) if Utc::now() <= start => Err(ApiError::NotStarted(start)),
        _ => Ok(()),
    }
}

/// Run a gateway operation under `deadline` and unwrap business errors.
///
/// Dropping the returned future (client gone) cancels the gateway call.
async fn call_gateway<F, R>(deadline: Duration, call: F) -> Result<R::Reply, ApiError>
where
    F: Future<Output = Result<R, GatewayError>>,
    R: GatewayReply + Debug,
{
    let rsp = tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| GatewayError::Timeout)??;

    tracing::info!(response = ?rsp, "Received gateway response");
    Ok(rsp.into_result()?)
}

fn finish<T: Serialize>(route: &'static str, result: Result<T, ApiError>) -> Response {
    match result {
        Ok(body) => {
            metrics::record_api_request(route, 200);
            json_response(&body)
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                tracing::error!(route, status = status.as_u16(), error = %err, "API request failed");
            } else {
                tracing::warn!(route, status = status.as_u16(), reason = %err, "API request rejected");
            }
            metrics::record_api_request(route, status.as_u16());
            err.into_response()
        }
    }
}
