//! teller-proxy
//!
//! HTTP/HTTPS front-end for the teller service.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                     TELLER PROXY                     │
//!                   │                                                      │
//!  Client ──HTTP───▶│  plain listener ─┐                                   │
//!                   │                  ├─▶ request id ─▶ security ─┐       │
//!  Client ──HTTPS──▶│  TLS listener ───┘   (host, redirect,        │       │
//!                   │  (static / ACME)      headers)               ▼       │
//!                   │                                    ┌─────────────────┐
//!                   │   /api/bind, /api/status ◀──────── │     router      │
//!                   │   gzip → rate limit → trace        │  (static files) │
//!                   │          │                         └─────────────────┘
//!                   │          ▼                                           │
//!                   │   handlers ──────▶ Gateway (teller daemon) ──────────┼──▶
//!                   │                                                      │
//!                   │  Cross-cutting: config · observability · lifecycle   │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use teller_proxy::config::{config_warnings, load_config, ServerConfig};
use teller_proxy::lifecycle::signals::terminate_signal;
use teller_proxy::observability::{init_logging, metrics};
use teller_proxy::{HttpGateway, HttpServer};

#[derive(Parser)]
#[command(name = "teller-proxy")]
#[command(about = "HTTP/HTTPS front-end for the teller service", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "teller-proxy starting");
    tracing::info!(
        http_addr = %config.listener.http_addr,
        https_addr = %config.listener.https_addr,
        api_enabled = config.api.enabled,
        html_interface = config.web.html_interface,
        "Configuration loaded"
    );
    for warning in config_warnings(&config) {
        tracing::warn!("{}", warning);
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut server = HttpServer::new(config.clone());
    if config.api.enabled {
        let gateway = HttpGateway::new(&config.gateway.url, config.api.request_timeout())?;
        tracing::info!(gateway = %config.gateway.url, "Forwarding API to teller");
        server = server.with_gateway(Arc::new(gateway));
    }
    let server = Arc::new(server);

    let mut running = tokio::spawn({
        let server = server.clone();
        async move { server.run().await }
    });

    tokio::select! {
        finished = &mut running => {
            finished??;
            tracing::info!("Listeners finished");
            return Ok(());
        }
        _ = terminate_signal() => {}
    }

    server.shutdown().await;
    running.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
