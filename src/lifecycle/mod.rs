//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Run (http::server):
//!     Idle → build router → provision TLS → Running (listeners serve)
//!
//! Shutdown (shutdown.rs):
//!     Trigger signal → Stop accepting → Drain connections → Idle
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One fresh shutdown signal per run; it never resets once triggered
//! - Shutdown has timeout: forced close after the grace period

pub mod shutdown;
pub mod signals;

pub use shutdown::ShutdownSignal;
