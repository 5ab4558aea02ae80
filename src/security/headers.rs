//! Host allowlisting, forced HTTPS and security response headers.
//!
//! # Responsibilities
//! - Reject requests for hosts outside the allowlist before routing
//! - Redirect plain-protocol requests to the secure host
//! - Add hardening headers to every response
//!
//! # Design Decisions
//! - Stateless: the policy is fixed when the listeners start
//! - The listener tags each request with its `Protocol`; untagged requests count as plain
//! - Headers are applied to rejections and redirects too

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// One year, this host only, not preloaded.
const STS_VALUE: &str = "max-age=31536000";

/// Which listener accepted the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Plain,
    Secure,
}

/// Host and redirect rules enforced by [`security_middleware`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityPolicy {
    ssl_host: Option<String>,
    allowed_hosts: Vec<String>,
}

impl SecurityPolicy {
    pub fn new(ssl_host: Option<String>, allowed_hosts: Vec<String>) -> Self {
        Self {
            ssl_host: ssl_host.filter(|h| !h.is_empty()),
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Derive the policy from the listener configuration.
    ///
    /// With an auto-TLS host that host is both the redirect target and the
    /// only allowed host. Otherwise plain requests are redirected to the
    /// secure listener address (if any) and every host is accepted.
    pub fn for_listeners(https_addr: &str, auto_tls_host: Option<&str>) -> Self {
        match auto_tls_host.filter(|h| !h.is_empty()) {
            Some(host) => Self::new(Some(host.to_string()), vec![host.to_string()]),
            None => Self::new(Some(https_addr.to_string()), Vec::new()),
        }
    }

    pub fn ssl_host(&self) -> Option<&str> {
        self.ssl_host.as_deref()
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    fn host_allowed(&self, host: Option<&str>) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        match host {
            Some(host) => {
                let host = strip_port(host).to_ascii_lowercase();
                self.allowed_hosts.iter().any(|allowed| *allowed == host)
            }
            None => false,
        }
    }

    fn redirect_location(&self, uri: &Uri) -> Option<String> {
        let ssl_host = self.ssl_host.as_deref()?;
        let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        Some(format!("https://{}{}", ssl_host, path))
    }
}

/// `example.org:443` → `example.org`, `[::1]:443` → `[::1]`.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

fn request_host(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
}

/// Add the hardening headers, replacing any set by inner handlers.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(STS_VALUE));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
}

/// Middleware enforcing a [`SecurityPolicy`].
pub async fn security_middleware(
    State(policy): State<Arc<SecurityPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = if !policy.host_allowed(request_host(&request)) {
        tracing::warn!(
            host = ?request_host(&request),
            path = %request.uri().path(),
            "Rejected request for disallowed host"
        );
        (StatusCode::INTERNAL_SERVER_ERROR, "Bad Host").into_response()
    } else {
        let protocol = request
            .extensions()
            .get::<Protocol>()
            .copied()
            .unwrap_or(Protocol::Plain);

        match policy.redirect_location(request.uri()) {
            Some(location) if protocol == Protocol::Plain => {
                tracing::debug!(%location, "Redirecting to HTTPS");
                match HeaderValue::from_str(&location) {
                    Ok(value) => {
                        (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response()
                    }
                    Err(_) => (StatusCode::BAD_REQUEST, "Bad Request").into_response(),
                }
            }
            _ => next.run(request).await,
        }
    };

    apply_security_headers(response.headers_mut());
    response
}
