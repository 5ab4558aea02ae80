//! HTTP front-end subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (server.rs)
//!     → request.rs (assign and propagate request ID)
//!     → security middleware (host allowlist, HTTPS redirect, headers)
//!     → router.rs (compression → rate limit → trace, per API route)
//!     → handlers.rs (validate, readiness gate, bounded gateway call)
//!     → error.rs / response.rs (JSON body or error envelope)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::{ApiState, BIND_PATH, STATUS_PATH};
pub use request::X_REQUEST_ID;
pub use router::build_router;
pub use server::{HttpServer, ServerError};
