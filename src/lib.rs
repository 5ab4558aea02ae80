//! Teller HTTP front-end library.
//!
//! Serves the teller JSON API (`/api/bind`, `/api/status`) and an optional
//! static web interface over plain HTTP and HTTPS, forwarding API calls to
//! a [`gateway::Gateway`].

pub mod address;
pub mod config;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::schema::ServerConfig;
pub use gateway::{Gateway, GatewayError, HttpGateway};
pub use http::{HttpServer, ServerError};
pub use lifecycle::ShutdownSignal;
