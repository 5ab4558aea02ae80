//! TLS certificate provisioning for the secure listener.
//!
//! Two mutually exclusive sources:
//! - static PEM certificate and key files
//! - automatic issuance through ACME (Let's Encrypt), cached on disk and
//!   resolved per connection so renewals need no restart

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use futures_util::StreamExt;
use rustls_acme::{caches::DirCache, AcmeConfig, AcmeState};
use thiserror::Error;

use crate::config::TlsConfig;

/// Errors raised while preparing TLS for the secure listener.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("no certificate source configured for the secure listener")]
    NoSource,

    #[error("{kind} file not found: {path:?}")]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("failed to load certificate: {0}")]
    Load(#[from] std::io::Error),
}

/// Where the secure listener gets its certificate from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateSource {
    Static { cert: PathBuf, key: PathBuf },
    Automatic { host: String, cache_dir: PathBuf },
}

impl CertificateSource {
    /// Pick the certificate source from configuration.
    ///
    /// The automatic manager wins when an auto-TLS host is configured; any
    /// static paths are then ignored.
    pub fn from_config(config: &TlsConfig) -> Result<Self, TlsError> {
        if let Some(host) = config.auto_tls_host.as_deref().filter(|h| !h.is_empty()) {
            if config.cert_path.is_some() || config.key_path.is_some() {
                tracing::warn!(host, "auto_tls_host is set, ignoring cert_path and key_path");
            }
            return Ok(Self::Automatic {
                host: host.to_string(),
                cache_dir: config.cache_dir.clone(),
            });
        }

        match (&config.cert_path, &config.key_path) {
            (Some(cert), Some(key)) => Ok(Self::Static {
                cert: cert.clone(),
                key: key.clone(),
            }),
            _ => Err(TlsError::NoSource),
        }
    }
}

/// Make sure rustls has a process-wide crypto provider before building configs.
pub fn install_crypto_provider() {
    // Err means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    if !cert_path.exists() {
        return Err(TlsError::MissingFile {
            kind: "Certificate",
            path: cert_path.to_path_buf(),
        });
    }
    if !key_path.exists() {
        return Err(TlsError::MissingFile {
            kind: "Private key",
            path: key_path.to_path_buf(),
        });
    }

    install_crypto_provider();
    Ok(RustlsConfig::from_pem_file(cert_path, key_path).await?)
}

/// Build the ACME state for a single host, caching certificates in `cache_dir`.
///
/// Accepting the CA's terms of service is implied by requesting a certificate.
pub fn acme_state(host: &str, cache_dir: &Path) -> AcmeState<std::io::Error, std::io::Error> {
    install_crypto_provider();
    AcmeConfig::new([host.to_string()])
        .cache(DirCache::new(cache_dir.to_path_buf()))
        .directory_lets_encrypt(true)
        .state()
}

/// Poll the ACME state forever, logging issuance and renewal events.
///
/// Certificates are only ordered and renewed while this future is polled.
pub async fn drive_acme(mut state: AcmeState<std::io::Error, std::io::Error>) {
    while let Some(event) = state.next().await {
        match event {
            Ok(ok) => tracing::info!(event = ?ok, "ACME event"),
            Err(err) => tracing::error!(error = ?err, "ACME error"),
        }
    }
}
