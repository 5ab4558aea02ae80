//! Per-route rate limiting middleware.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::ThrottleConfig;
use crate::http::response::error_response;
use crate::observability::metrics;

/// Buckets are pruned once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

/// A simple token bucket rate limiter.
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn refill(&mut self, capacity: f64, refill_rate: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> Result<(), Duration> {
        self.refill(capacity, refill_rate, now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / refill_rate))
        }
    }
}

/// Request quota for a single route.
///
/// Every client gets `max` requests per `duration`, refilled continuously.
/// Each route owns its own limiter; nothing is shared across routes.
#[derive(Debug)]
pub struct RateLimiter {
    route: &'static str,
    capacity: f64,
    refill_rate: f64,
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    pub fn new(route: &'static str, policy: ThrottleConfig) -> Self {
        let capacity = f64::from(policy.max.max(1));
        let window = policy.duration().as_secs_f64().max(f64::EPSILON);
        Self {
            route,
            capacity,
            refill_rate: capacity / window,
            buckets: DashMap::new(),
        }
    }

    pub fn route(&self) -> &'static str {
        self.route
    }

    /// Take one token for `key`, or return how long until one is available.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        if self.buckets.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }

        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity, now));
        bucket.try_acquire(self.capacity, self.refill_rate, now)
    }

    /// Drop buckets that have refilled completely; they carry no state.
    fn prune(&self, now: Instant) {
        let (capacity, rate) = (self.capacity, self.refill_rate);
        self.buckets.retain(|_, bucket| {
            bucket.refill(capacity, rate, now);
            bucket.tokens < capacity
        });
    }
}

fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting requests over the route's quota with 429.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match limiter.check(&key) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(client = %key, route = limiter.route(), "Rate limit exceeded");
            metrics::record_rate_limited(limiter.route());

            let mut response = error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "You have reached maximum request limit.",
            );
            let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}
