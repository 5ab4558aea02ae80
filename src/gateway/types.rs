//! Request and response types exchanged with the gateway.

use serde::{Deserialize, Serialize};

use crate::gateway::GatewayError;

/// Ask the gateway to bind a deposit address to a skycoin address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindRequest {
    pub skyaddr: String,
}

/// Gateway answer to a [`BindRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindResponse {
    /// Deposit address assigned to the skycoin address.
    #[serde(default)]
    pub btc_address: String,
    /// Business-level failure reported by the gateway.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Look up the deposit statuses of a skycoin address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusRequest {
    pub skyaddr: String,
}

/// State of a single deposit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepositStatus {
    pub seq: u64,
    pub update_at: i64,
    pub status: String,
}

/// Gateway answer to a [`StatusRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    #[serde(default)]
    pub statuses: Vec<DepositStatus>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Client-facing body of a successful bind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindReply {
    pub btc_address: String,
}

/// Client-facing body of a successful status lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReply {
    pub statuses: Vec<DepositStatus>,
}

/// Responses that may carry an embedded business error.
pub trait GatewayReply: Sized {
    type Reply: Serialize;

    fn error_message(&self) -> &str;

    fn into_reply(self) -> Self::Reply;

    /// Split a structurally successful response into the client body or
    /// the business error it carries.
    fn into_result(self) -> Result<Self::Reply, GatewayError> {
        if self.error_message().is_empty() {
            Ok(self.into_reply())
        } else {
            Err(GatewayError::Business(self.error_message().to_string()))
        }
    }
}

impl GatewayReply for BindResponse {
    type Reply = BindReply;

    fn error_message(&self) -> &str {
        &self.error
    }

    fn into_reply(self) -> BindReply {
        BindReply {
            btc_address: self.btc_address,
        }
    }
}

impl GatewayReply for StatusResponse {
    type Reply = StatusReply;

    fn error_message(&self) -> &str {
        &self.error
    }

    fn into_reply(self) -> StatusReply {
        StatusReply {
            statuses: self.statuses,
        }
    }
}
