//! Route table.
//!
//! API routes are each wrapped, outermost first, in gzip compression, their
//! own rate limiter and request logging. The static file tree, when enabled,
//! answers every path the API does not claim.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{any, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::config::{ServerConfig, ThrottleConfig};
use crate::gateway::Gateway;
use crate::http::handlers::{bind_handler, status_handler, ApiState, BIND_PATH, STATUS_PATH};
use crate::http::request::request_id;
use crate::security::{rate_limit_middleware, RateLimiter};

/// Build the route table. API routes are mounted only when a gateway is given.
pub fn build_router(config: &ServerConfig, gateway: Option<Arc<dyn Gateway>>) -> Router {
    let mut router = Router::new();

    match gateway {
        Some(gateway) => {
            let state = ApiState::new(
                gateway,
                config.api.start_at,
                config.api.request_timeout(),
            );
            let api = Router::new()
                .route(BIND_PATH, api_route(any(bind_handler), BIND_PATH, config.throttle))
                .route(STATUS_PATH, api_route(any(status_handler), STATUS_PATH, config.throttle))
                .with_state(state);
            router = router.merge(api);
        }
        None => tracing::info!("No gateway configured, API routes disabled"),
    }

    if config.web.html_interface {
        tracing::info!(static_dir = %config.web.static_dir.display(), "Serving static files");
        let files = ServiceBuilder::new()
            .layer(CompressionLayer::new())
            .service(ServeDir::new(&config.web.static_dir));
        router = router.fallback_service(files);
    }

    router
}

/// Wrap one API route in compression, its own rate limiter and logging.
fn api_route(
    route: MethodRouter<ApiState>,
    path: &'static str,
    throttle: ThrottleConfig,
) -> MethodRouter<ApiState> {
    let limiter = Arc::new(RateLimiter::new(path, throttle));

    route
        .layer::<_, Infallible>(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "api",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id(request),
            )
        }))
        .layer::<_, Infallible>(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(CompressionLayer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, StatusCode};
    use futures_util::future::{BoxFuture, FutureExt};
    use tower::ServiceExt;

    use crate::address::Address;
    use crate::gateway::{
        BindRequest, BindResponse, DepositStatus, GatewayError, StatusRequest, StatusResponse,
    };

    struct EchoGateway;

    impl Gateway for EchoGateway {
        fn bind_address(&self, req: BindRequest) -> BoxFuture<'_, Result<BindResponse, GatewayError>> {
            async move {
                Ok(BindResponse {
                    btc_address: format!("deposit-for-{}", req.skyaddr),
                    error: String::new(),
                })
            }
            .boxed()
        }

        fn get_deposit_statuses(
            &self,
            _req: StatusRequest,
        ) -> BoxFuture<'_, Result<StatusResponse, GatewayError>> {
            async {
                Ok(StatusResponse {
                    statuses: (1..=3)
                        .map(|seq| DepositStatus {
                            seq,
                            update_at: 1_500_000_000,
                            status: "waiting_deposit".into(),
                        })
                        .collect(),
                    error: String::new(),
                })
            }
            .boxed()
        }
    }

    fn config(throttle_max: u32) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.throttle = ThrottleConfig {
            max: throttle_max,
            duration_secs: 10,
        };
        config
    }

    fn status_req() -> Request<Body> {
        let addr = Address::from_key_hash([5u8; 20]);
        Request::builder()
            .uri(format!("{}?skyaddr={}", STATUS_PATH, addr))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn routes_have_independent_quotas() {
        let router = build_router(&config(1), Some(Arc::new(EchoGateway)));

        let first = router.clone().oneshot(status_req()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = router.clone().oneshot(status_req()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));

        // The bind route still has its own token.
        let bind = Request::builder()
            .method(Method::GET)
            .uri(BIND_PATH)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(bind).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn api_disabled_without_gateway() {
        let router = build_router(&config(10), None);
        let response = router.oneshot(status_req()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn compresses_when_client_accepts_gzip() {
        let router = build_router(&config(10), Some(Arc::new(EchoGateway)));
        let mut request = status_req();
        request
            .headers_mut()
            .insert(header::ACCEPT_ENCODING, "gzip".parse().unwrap());

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    }

    #[tokio::test]
    async fn serves_static_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>teller</h1>").unwrap();

        let mut config = config(10);
        config.web.html_interface = true;
        config.web.static_dir = dir.path().to_path_buf();
        let router = build_router(&config, Some(Arc::new(EchoGateway)));

        let index = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = router.clone().oneshot(index).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let missing = Request::builder().uri("/nope.js").body(Body::empty()).unwrap();
        let response = router.oneshot(missing).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
