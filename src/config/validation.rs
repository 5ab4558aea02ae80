//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate listener addresses and value ranges (timeouts > 0, quota > 0)
//! - Check that the secure listener has exactly one certificate source
//! - Report non-fatal problems as warnings for the caller to log
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("https_addr is set but no certificate source is configured (auto_tls_host or cert_path/key_path)")]
    MissingCertificate,

    #[error("cert_path and key_path must be set together")]
    IncompleteKeyPair,

    #[error("auto_tls_host must not be empty")]
    EmptyAutoTlsHost,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("gateway.url is not a valid URL: {0}")]
    InvalidGatewayUrl(String),
}

/// A configuration problem that does not prevent startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigWarning {
    #[error("Static directory {} does not exist, web interface will return 404", .0.display())]
    MissingStaticDir(PathBuf),
}

/// Non-fatal problems, returned rather than logged so they can be reported
/// once logging is up.
pub fn config_warnings(config: &ServerConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    if config.web.html_interface && !config.web.static_dir.is_dir() {
        warnings.push(ConfigWarning::MissingStaticDir(config.web.static_dir.clone()));
    }
    warnings
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("listener.http_addr", &config.listener.http_addr),
        ("listener.https_addr", &config.listener.https_addr),
    ] {
        if !value.is_empty() && value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }

    let tls = &config.tls;
    if tls.cert_path.is_some() != tls.key_path.is_some() {
        errors.push(ValidationError::IncompleteKeyPair);
    }
    match tls.auto_tls_host.as_deref() {
        Some(host) if host.trim().is_empty() => errors.push(ValidationError::EmptyAutoTlsHost),
        Some(_) => {}
        None => {
            if !config.listener.https_addr.is_empty() && tls.cert_path.is_none() && tls.key_path.is_none() {
                errors.push(ValidationError::MissingCertificate);
            }
        }
    }

    if config.throttle.max == 0 {
        errors.push(ValidationError::Zero("throttle.max"));
    }
    if config.throttle.duration_secs == 0 {
        errors.push(ValidationError::Zero("throttle.duration_secs"));
    }
    if config.listener.read_timeout_secs == 0 {
        errors.push(ValidationError::Zero("listener.read_timeout_secs"));
    }
    if config.listener.write_timeout_secs == 0 {
        errors.push(ValidationError::Zero("listener.write_timeout_secs"));
    }
    if config.api.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("api.request_timeout_secs"));
    }

    if config.api.enabled && url::Url::parse(&config.gateway.url).is_err() {
        errors.push(ValidationError::InvalidGatewayUrl(config.gateway.url.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
