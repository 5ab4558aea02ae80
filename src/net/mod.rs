//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Secure listener startup
//!     → tls.rs (pick certificate source)
//!         static:    PEM files → RustlsConfig
//!         automatic: ACME state → per-connection acceptor (+ cert-cache)
//!     → Hand off to the HTTP layer (http::server)
//! ```
//!
//! # Design Decisions
//! - Exactly one certificate source is active per secure listener
//! - TLS is optional; the plain listener never touches this module

pub mod tls;

pub use tls::{CertificateSource, TlsError};
