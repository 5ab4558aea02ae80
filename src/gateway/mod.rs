//! Gateway capability.
//!
//! # Responsibilities
//! - Define the two operations the API delegates to (bind, status)
//! - Classify failures so handlers dispatch on a tag, not a value
//!
//! # Design Decisions
//! - Object-safe trait returning boxed futures, shared as `Arc<dyn Gateway>`
//! - Cancellation is by drop: a caller that stops polling abandons the call
//! - `HttpGateway` is the only bundled implementation; tests provide mocks

pub mod http;
pub mod types;

use futures_util::future::BoxFuture;
use thiserror::Error;

pub use http::HttpGateway;
pub use types::{
    BindReply, BindRequest, BindResponse, DepositStatus, GatewayReply, StatusReply,
    StatusRequest, StatusResponse,
};

/// Tagged gateway failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The call did not finish before its deadline.
    #[error("gateway request timed out")]
    Timeout,

    /// The gateway answered but reported a business-level error.
    #[error("{0}")]
    Business(String),

    /// Transport or internal failure talking to the gateway.
    #[error("gateway error: {0}")]
    Transport(String),
}

/// Backend that performs address binding and deposit lookups.
pub trait Gateway: Send + Sync + 'static {
    fn bind_address(&self, req: BindRequest) -> BoxFuture<'_, Result<BindResponse, GatewayError>>;

    fn get_deposit_statuses(
        &self,
        req: StatusRequest,
    ) -> BoxFuture<'_, Result<StatusResponse, GatewayError>>;
}
