//! Rate limiting middleware using Governor.
//!
//! Per-client token buckets for the payment creation routes.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;

/// Requests per minute when nothing is configured.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Client buckets tracked before idle ones are evicted.
pub const DEFAULT_MAX_CLIENTS: usize = 10_000;

const ANONYMOUS: &str = "anonymous";
const OVERFLOW: &str = "overflow";

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<String>,
    trust_forwarded_for: bool,
    max_clients: usize,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}

impl RateLimiterState {
    /// Creates a limiter allowing `requests_per_minute` per client.
    ///
    /// Zero is treated as one; a bucket must hold at least one token.
    /// Clients are keyed by peer address until
    /// [`trust_forwarded_for`](Self::trust_forwarded_for) is enabled.
    pub fn new(requests_per_minute: u32) -> Self {
        let burst = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: RateLimiter::dashmap(Quota::per_minute(burst)),
            trust_forwarded_for: false,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }

    /// Keys clients by the first `X-Forwarded-For` hop.
    ///
    /// Only safe behind a proxy that overwrites the header; otherwise any
    /// caller can pick its own bucket.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Caps the number of tracked client buckets.
    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients.max(1);
        self
    }

    /// Number of client buckets currently held.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Returns true if the request is allowed, false if rate limited.
    ///
    /// At capacity, buckets that have refilled are dropped first. If the map
    /// is still full, every caller shares a single overflow bucket until
    /// older buckets go idle.
    pub fn check(&self, key: &str) -> bool {
        if self.limiter.len() >= self.max_clients {
            self.limiter.retain_recent();
            self.limiter.shrink_to_fit();
        }

        let key = if self.limiter.len() >= self.max_clients {
            OVERFLOW
        } else {
            key
        };

        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Bucket key for a request.
    fn client_key(&self, request: &Request<Body>) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(hop) = forwarded {
                return hop.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }
}

/// Rate limiting middleware. Attached only to the creation routes.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = limiter.client_key(&request);

    if !limiter.check(&key) {
        tracing::warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "retry_after_seconds": 60
            })),
        )
            .into_response();
    }

    next.run(request).await
}
