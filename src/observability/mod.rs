//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers, middleware and the lifecycle manager produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (API and throttling counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! # Design Decisions
//! - JSON output for log shippers, pretty output for terminals
//! - Every API span carries the `x-request-id` of its request
//! - Counters are labelled by route so the two API endpoints stay separate

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
