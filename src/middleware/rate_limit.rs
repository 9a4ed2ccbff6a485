//! Fixed-window request limiting per client IP for `/api/*`.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::{broadcast, Mutex};

use crate::config::RateLimitConfig;
use crate::response::AppError;
use crate::state::AppState;

/// Service-to-service calls are authenticated by key and not throttled.
const EXEMPT_PREFIX: &str = "/api/internal/";

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u64,
}

/// Outcome of counting one request against its client's window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub retry_after: Duration,
}

impl Decision {
    fn reset_at_unix(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        (now + self.retry_after).as_secs()
    }

    pub fn write_headers(&self, headers: &mut HeaderMap) {
        let mut put = |name: &'static str, value: u64| {
            headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
        };
        put("ratelimit-limit", self.limit);
        put("ratelimit-remaining", self.remaining);
        put("ratelimit-reset", self.reset_at_unix());
        if !self.allowed {
            put("retry-after", self.retry_after.as_secs().max(1));
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u64,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a request from `ip` at `now`. Rejected requests do not count.
    pub async fn check_at(&self, ip: IpAddr, now: Instant) -> Decision {
        let mut clients = self.clients.lock().await;
        let window = clients.entry(ip).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.saturating_duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                hits: 0,
            };
        }

        let allowed = window.hits < self.max_requests;
        if allowed {
            window.hits += 1;
        }
        let elapsed = now.saturating_duration_since(window.started);

        Decision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.hits),
            retry_after: self.window.saturating_sub(elapsed),
        }
    }

    pub async fn check(&self, ip: IpAddr) -> Decision {
        self.check_at(ip, Instant::now()).await
    }

    /// Drops clients whose window ended; returns how many were dropped.
    pub async fn prune_at(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before - clients.len()
    }

    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = client_ip(req.headers(), peer, state.config().trust_proxy);
    let decision = state.rate_limit().check(ip).await;

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        tracing::warn!(%ip, limit = decision.limit, "Rate limit exceeded");
        AppError::too_many_requests("Too many requests").into_response()
    };
    decision.write_headers(response.headers_mut());
    response
}

/// Layers on the nested `/api` router see the path with the prefix stripped.
fn is_exempt(path: &str) -> bool {
    let full = if path.starts_with("/api/") {
        path.to_string()
    } else {
        format!("/api{path}")
    };
    full.starts_with(EXEMPT_PREFIX)
}

/// `x-forwarded-for` is honored only behind a trusted proxy; otherwise
/// `x-real-ip`, then the socket peer, then loopback.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> IpAddr {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    trust_proxy
        .then(|| header_ip("x-forwarded-for"))
        .flatten()
        .or_else(|| header_ip("x-real-ip"))
        .or(peer)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub async fn rate_limit_cleanup_loop(
    limiter: Arc<RateLimiter>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let pruned = limiter.prune_at(Instant::now()).await;
                if pruned > 0 {
                    let tracked = limiter.tracked_clients().await;
                    tracing::debug!(pruned, tracked, "Rate limit windows pruned");
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}
