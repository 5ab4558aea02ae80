//! Listener lifecycle management.
//!
//! # Responsibilities
//! - Wrap the route table in the security middleware and ambient layers
//! - Run zero, one or two listeners (plain and TLS) concurrently
//! - Provision TLS from static files or ACME for the secure listener
//! - Stop listeners gracefully and allow the server to be run again
//!
//! # Design Decisions
//! - Explicit state machine: `Idle → Running → Stopping → Idle`; a new
//!   run is refused until the previous one has fully stopped
//! - One fresh `ShutdownSignal` per run; `shutdown` triggers it and stops
//!   each listener through its `axum_server::Handle`
//! - `shutdown` returns only once every listener socket is closed, so `run`
//!   can rebind the same addresses right away
//! - The first listener error wins; the survivor is stopped gracefully
//! - The state lock is never held across `.await`
//!
//! # Data Flow
//! ```text
//! run():
//!     Idle → Running { signal, handles }
//!     → serve plain / secure in a JoinSet
//!     → wait for signal or first listener exit
//!     → Idle
//!
//! shutdown():
//!     Running → Stopping → trigger signal → graceful_shutdown(grace)
//!     → wait for each listener to stop → Idle
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{middleware, Extension, Router};
use axum_server::Handle;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use thiserror::Error;
use tokio::task::JoinSet;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::gateway::Gateway;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::router::build_router;
use crate::lifecycle::ShutdownSignal;
use crate::net::tls::{self, CertificateSource, TlsError};
use crate::security::{security_middleware, Protocol, SecurityPolicy};

/// Extra time allowed past the grace period for forced closes to land.
const DRAIN_SLACK: Duration = Duration::from_millis(500);

const PLAIN: &str = "HTTP";
const SECURE: &str = "HTTPS";

/// Errors returned from [`HttpServer::run`].
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server is already running")]
    AlreadyRunning,

    #[error("{field} is not a valid socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("{protocol} listener failed: {source}")]
    Listener {
        protocol: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("listener task failed: {0}")]
    Task(String),
}

/// One listener: its accept loop control and a flag raised once it has
/// closed its socket and finished every connection.
#[derive(Clone)]
struct Listener {
    handle: Handle,
    stopped: ShutdownSignal,
}

impl Listener {
    fn new() -> Self {
        Self {
            handle: Handle::new(),
            stopped: ShutdownSignal::new(),
        }
    }
}

/// Listeners of one run.
#[derive(Clone)]
struct Listeners {
    signal: ShutdownSignal,
    plain: Option<Listener>,
    secure: Option<Listener>,
}

impl Listeners {
    fn all(&self) -> impl Iterator<Item = &Listener> {
        [&self.plain, &self.secure].into_iter().flatten()
    }
}

enum Lifecycle {
    Idle,
    Running(Listeners),
    Stopping,
}

/// The dual HTTP/HTTPS front-end.
pub struct HttpServer {
    config: Arc<ServerConfig>,
    gateway: Option<Arc<dyn Gateway>>,
    state: Mutex<Lifecycle>,
}

impl HttpServer {
    /// Create an idle server. Without a gateway only static files are served.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            gateway: None,
            state: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Mount the API routes backed by `gateway`.
    pub fn with_gateway(mut self, gateway: Arc<dyn Gateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock_state(), Lifecycle::Running(_))
    }

    /// Serve until [`shutdown`](Self::shutdown) is called or a listener fails.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = &self.config.listener;
        tracing::info!("HTTP service start");

        if listener.http_addr.is_empty() && listener.https_addr.is_empty() {
            tracing::warn!("Neither http_addr nor https_addr is configured, nothing to serve");
            return Ok(());
        }

        let plain_addr = parse_addr("listener.http_addr", &listener.http_addr)?;
        let secure = match parse_addr("listener.https_addr", &listener.https_addr)? {
            Some(addr) => Some((addr, CertificateSource::from_config(&self.config.tls)?)),
            None => None,
        };

        let listeners = self.begin(plain_addr.is_some(), secure.is_some())?;
        let _guard = RunGuard {
            server: self,
            signal: listeners.signal.clone(),
        };

        let result = self.serve(&listeners, plain_addr, secure).await;
        tracing::info!("HTTP service closed");
        result
    }

    /// Stop the listeners gracefully. A no-op unless running.
    ///
    /// Returns once both listener sockets are closed, or after the grace
    /// period plus a small slack if a listener refuses to stop.
    pub async fn shutdown(&self) {
        let listeners = {
            let mut state = self.lock_state();
            match std::mem::replace(&mut *state, Lifecycle::Stopping) {
                Lifecycle::Running(listeners) => listeners,
                other => {
                    *state = other;
                    tracing::debug!("Shutdown requested while not running");
                    return;
                }
            }
        };
        let _idle = IdleOnDrop(self);

        tracing::info!("Shutting down HTTP service");
        listeners.signal.trigger();

        let grace = self.config.listener.shutdown_timeout();
        tokio::join!(
            stop_listener(PLAIN, listeners.plain, grace),
            stop_listener(SECURE, listeners.secure, grace),
        );
        tracing::info!("HTTP service stopped");
    }

    fn lock_state(&self) -> MutexGuard<'_, Lifecycle> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `Idle` to `Running` with fresh handles.
    fn begin(&self, plain: bool, secure: bool) -> Result<Listeners, ServerError> {
        let mut state = self.lock_state();
        if !matches!(*state, Lifecycle::Idle) {
            return Err(ServerError::AlreadyRunning);
        }

        let listeners = Listeners {
            signal: ShutdownSignal::new(),
            plain: plain.then(Listener::new),
            secure: secure.then(Listener::new),
        };
        *state = Lifecycle::Running(listeners.clone());
        Ok(listeners)
    }

    /// Router with the security middleware and per-request ambient layers.
    #[allow(deprecated)]
    fn build_app(&self) -> Router {
        let policy = SecurityPolicy::for_listeners(
            &self.config.listener.https_addr,
            self.config.tls.auto_tls_host.as_deref(),
        );
        tracing::info!(
            ssl_host = policy.ssl_host().unwrap_or(""),
            allowed_hosts = ?policy.allowed_hosts(),
            "Security policy"
        );

        build_router(&self.config, self.gateway.clone())
            .layer(TimeoutLayer::new(self.config.listener.write_timeout()))
            .layer(middleware::from_fn_with_state(Arc::new(policy), security_middleware))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    async fn serve(
        &self,
        listeners: &Listeners,
        plain_addr: Option<SocketAddr>,
        secure: Option<(SocketAddr, CertificateSource)>,
    ) -> Result<(), ServerError> {
        let app = self.build_app();
        let read_timeout = self.config.listener.read_timeout();
        let mut tasks = JoinSet::new();

        if let (Some(addr), Some(listener)) = (plain_addr, &listeners.plain) {
            tasks.spawn(until_stopped(
                listener.stopped.clone(),
                serve_plain(addr, app.clone(), listener.handle.clone(), read_timeout),
            ));
        }
        if let (Some((addr, source)), Some(listener)) = (secure, &listeners.secure) {
            tasks.spawn(until_stopped(
                listener.stopped.clone(),
                serve_secure(addr, source, app, listener.handle.clone(), read_timeout),
            ));
        }

        let outcome = loop {
            tokio::select! {
                _ = listeners.signal.wait() => break Ok(()),
                joined = tasks.join_next() => match joined {
                    None => break Ok(()),
                    Some(Ok(Ok(()))) => continue,
                    Some(Ok(Err(e))) if listeners.signal.is_triggered() => {
                        tracing::debug!(error = %e, "Listener error after shutdown");
                        break Ok(());
                    }
                    Some(Ok(Err(e))) => break Err(e),
                    Some(Err(e)) if listeners.signal.is_triggered() => {
                        tracing::debug!(error = %e, "Listener task ended after shutdown");
                        break Ok(());
                    }
                    Some(Err(e)) => break Err(ServerError::Task(e.to_string())),
                },
            }
        };

        if let Err(e) = &outcome {
            tracing::error!(error = %e, "Listener failed, stopping the others");
            let grace = self.config.listener.shutdown_timeout();
            for listener in listeners.all() {
                listener.handle.graceful_shutdown(Some(grace));
            }

            // Later failures are only logged.
            let drained = tokio::time::timeout(grace + DRAIN_SLACK, async {
                while let Some(joined) = tasks.join_next().await {
                    if let Ok(Err(e)) = joined {
                        tracing::warn!(error = %e, "Listener failed during stop");
                    }
                }
            })
            .await;
            if drained.is_err() {
                tracing::warn!("Listeners still open after grace period");
            }
        }

        // In-flight requests finish under the handles' grace period;
        // `shutdown` waits for them through each listener's stopped flag.
        tasks.detach_all();
        outcome
    }
}

/// Returns the server to `Idle` when its run ends, unless a newer run took over.
struct RunGuard<'a> {
    server: &'a HttpServer,
    signal: ShutdownSignal,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.server.lock_state();
        if let Lifecycle::Running(current) = &*state {
            if current.signal.same_as(&self.signal) {
                *state = Lifecycle::Idle;
            }
        }
    }
}

/// Marks the server idle once a shutdown finishes, even if it is cancelled.
struct IdleOnDrop<'a>(&'a HttpServer);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.lock_state() = Lifecycle::Idle;
    }
}

/// Raises a listener's stopped flag when its serve task ends or is aborted.
struct StoppedOnDrop(ShutdownSignal);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0.trigger();
    }
}

async fn until_stopped<F>(stopped: ShutdownSignal, serve: F) -> Result<(), ServerError>
where
    F: Future<Output = Result<(), ServerError>>,
{
    let _stopped = StoppedOnDrop(stopped);
    serve.await
}

fn parse_addr(field: &'static str, value: &str) -> Result<Option<SocketAddr>, ServerError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ServerError::InvalidAddress {
            field,
            value: value.to_string(),
        })
}

/// Header read timeout on every HTTP/1 connection.
fn configure_connections(builder: &mut Builder<TokioExecutor>, read_timeout: Duration) {
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(read_timeout);
}

async fn serve_plain(
    addr: SocketAddr,
    app: Router,
    handle: Handle,
    read_timeout: Duration,
) -> Result<(), ServerError> {
    tracing::info!(address = %addr, "HTTP listener starting");

    let app = app
        .layer(Extension(Protocol::Plain))
        .into_make_service_with_connect_info::<SocketAddr>();
    let mut server = axum_server::bind(addr).handle(handle);
    configure_connections(server.http_builder(), read_timeout);

    server.serve(app).await.map_err(|source| ServerError::Listener {
        protocol: PLAIN,
        source,
    })
}

async fn serve_secure(
    addr: SocketAddr,
    source: CertificateSource,
    app: Router,
    handle: Handle,
    read_timeout: Duration,
) -> Result<(), ServerError> {
    let app = app
        .layer(Extension(Protocol::Secure))
        .into_make_service_with_connect_info::<SocketAddr>();
    let listener_error = |source| ServerError::Listener {
        protocol: SECURE,
        source,
    };

    match source {
        CertificateSource::Static { cert, key } => {
            tracing::info!(address = %addr, cert = %cert.display(), "HTTPS listener starting");
            let tls = tls::load_tls_config(&cert, &key).await?;

            let mut server = axum_server::bind_rustls(addr, tls).handle(handle);
            configure_connections(server.http_builder(), read_timeout);
            server.serve(app).await.map_err(listener_error)
        }
        CertificateSource::Automatic { host, cache_dir } => {
            tracing::info!(
                address = %addr,
                %host,
                cache_dir = %cache_dir.display(),
                "HTTPS listener starting with automatic certificates"
            );
            let state = tls::acme_state(&host, &cache_dir);
            let acceptor = state.axum_acceptor(state.default_rustls_config());

            let mut server = axum_server::bind(addr).acceptor(acceptor).handle(handle);
            configure_connections(server.http_builder(), read_timeout);

            tokio::select! {
                served = server.serve(app) => served.map_err(listener_error),
                () = tls::drive_acme(state) => {
                    Err(listener_error(io::Error::other("ACME event stream ended")))
                }
            }
        }
    }
}

async fn stop_listener(protocol: &'static str, listener: Option<Listener>, grace: Duration) {
    let Some(listener) = listener else { return };

    tracing::info!(protocol, grace = ?grace, "Stopping listener");
    listener.handle.graceful_shutdown(Some(grace));

    let stopped = tokio::time::timeout(grace + DRAIN_SLACK, listener.stopped.wait()).await;
    if stopped.is_err() {
        tracing::warn!(
            protocol,
            remaining = listener.handle.connection_count(),
            "Listener still open after grace period"
        );
    }
}
