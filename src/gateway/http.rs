//! JSON-over-HTTP gateway client.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use url::Url;

use crate::gateway::{
    BindRequest, BindResponse, Gateway, GatewayError, StatusRequest, StatusResponse,
};

/// Gateway backed by a remote teller daemon reachable over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base = Url::parse(base).map_err(|e| GatewayError::Transport(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { base, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

fn classify(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}

impl Gateway for HttpGateway {
    fn bind_address(&self, req: BindRequest) -> BoxFuture<'_, Result<BindResponse, GatewayError>> {
        async move {
            let url = self.endpoint("api/bind")?;
            tracing::debug!(%url, skyaddr = %req.skyaddr, "Forwarding bind request");

            let rsp = self
                .client
                .post(url)
                .json(&req)
                .send()
                .await
                .map_err(classify)?;
            rsp.json::<BindResponse>().await.map_err(classify)
        }
        .boxed()
    }

    fn get_deposit_statuses(
        &self,
        req: StatusRequest,
    ) -> BoxFuture<'_, Result<StatusResponse, GatewayError>> {
        async move {
            let url = self.endpoint("api/status")?;
            tracing::debug!(%url, skyaddr = %req.skyaddr, "Forwarding status request");

            let rsp = self
                .client
                .get(url)
                .query(&[("skyaddr", req.skyaddr.as_str())])
                .send()
                .await
                .map_err(classify)?;
            rsp.json::<StatusResponse>().await.map_err(classify)
        }
        .boxed()
    }
}
