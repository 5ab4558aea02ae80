//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (every route):
//!     → headers.rs (host allowlist, HTTPS redirect, hardening headers)
//!     → Pass to routing
//!
//! API routes only:
//!     → rate_limit.rs (per-route, per-client quota)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Defense in depth: host checks before routing, quotas before handlers
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod headers;
pub mod rate_limit;

pub use headers::{apply_security_headers, security_middleware, Protocol, SecurityPolicy};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
