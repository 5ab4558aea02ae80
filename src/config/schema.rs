//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root configuration for the teller front-end.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (plain and secure addresses, timeouts).
    pub listener: ListenerConfig,

    /// Certificate provisioning for the secure listener.
    pub tls: TlsConfig,

    /// Static web interface.
    pub web: WebConfig,

    /// JSON API settings.
    pub api: ApiConfig,

    /// Per-route request throttle.
    pub throttle: ThrottleConfig,

    /// Remote gateway (teller daemon) settings.
    pub gateway: GatewayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Plain HTTP bind address (e.g., "0.0.0.0:7071"). Empty disables it.
    pub http_addr: String,

    /// HTTPS bind address. Empty disables it.
    pub https_addr: String,

    /// Time allowed to read request headers, in seconds.
    pub read_timeout_secs: u64,

    /// Time allowed to produce a response, in seconds.
    pub write_timeout_secs: u64,

    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl ListenerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:7071".to_string(),
            https_addr: String::new(),
            read_timeout_secs: 10,
            write_timeout_secs: 60,
            shutdown_timeout_secs: 5,
        }
    }
}

/// TLS configuration for the secure listener.
///
/// `auto_tls_host` takes precedence: when it is set the static
/// certificate paths are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Host name for automatic (ACME) certificate issuance.
    pub auto_tls_host: Option<String>,

    /// Path to certificate file (PEM).
    pub cert_path: Option<PathBuf>,

    /// Path to private key file (PEM).
    pub key_path: Option<PathBuf>,

    /// Directory where issued certificates are cached.
    pub cache_dir: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            auto_tls_host: None,
            cert_path: None,
            key_path: None,
            cache_dir: PathBuf::from("cert-cache"),
        }
    }
}

/// Static file interface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    /// Serve the static file tree at `/`.
    pub html_interface: bool,

    /// Root of the static file tree.
    pub static_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            html_interface: false,
            static_dir: PathBuf::from("./web/build"),
        }
    }
}

/// JSON API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Mount `/api/bind` and `/api/status`. Disabled means static files only.
    pub enabled: bool,

    /// The API rejects requests until this instant. `None` means always open.
    pub start_at: Option<DateTime<Utc>>,

    /// Deadline for a single gateway call, in seconds.
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_at: None,
            request_timeout_secs: 30,
        }
    }
}

/// Rate limiting policy, applied to each API route independently.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Maximum requests per window.
    pub max: u32,

    /// Window length in seconds.
    pub duration_secs: u64,
}

impl ThrottleConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max: 60,
            duration_secs: 60,
        }
    }
}

/// Remote gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the teller daemon (e.g., "http://127.0.0.1:7070").
    pub url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7070".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
