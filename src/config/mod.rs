//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, warnings)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc with the lifecycle manager and handlers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig, ServerConfig,
    ThrottleConfig, TlsConfig, WebConfig,
};
pub use validation::{config_warnings, validate_config, ConfigWarning, ValidationError};
