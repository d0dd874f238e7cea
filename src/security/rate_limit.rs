//! Fixed-window rate limiting per client address.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lru::LruCache;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::proxy::ProxyError;
use crate::security::headers::client_identifier;

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Upper bound on lock shards for the window table.
const MAX_SHARDS: usize = 16;

/// Tables smaller than this per shard stay in a single shard.
const MIN_SHARD_CAPACITY: usize = 1024;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Admitted {
        limit: u32,
        remaining: u32,
        reset_after: Duration,
    },
    Limited {
        limit: u32,
        retry_after: Duration,
    },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateDecision::Admitted { .. })
    }
}

/// A store of per-client request windows.
///
/// The proxy only depends on this trait, so a shared counter service can
/// replace the in-memory store when running more than one instance.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `client` and decide whether to admit it.
    async fn check(&self, client: &str) -> RateDecision;

    /// Number of client windows currently held.
    fn tracked_clients(&self) -> usize;
}

/// Request count for one client within the current window.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    reset_at: Instant,
}

impl RateWindow {
    fn new(now: Instant, length: Duration) -> Self {
        Self {
            count: 0,
            reset_at: now + length,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now > self.reset_at
    }

    fn admit(&mut self, now: Instant, length: Duration, max: u32) -> RateDecision {
        if self.is_expired(now) {
            *self = RateWindow::new(now, length);
        }

        let remaining_time = self.reset_at.saturating_duration_since(now);
        if self.count >= max {
            return RateDecision::Limited {
                limit: max,
                retry_after: remaining_time,
            };
        }

        self.count += 1;
        RateDecision::Admitted {
            limit: max,
            remaining: max - self.count,
            reset_after: remaining_time,
        }
    }
}

type WindowShard = LruCache<String, RateWindow>;

/// In-process rate limiter keyed by client identifier.
///
/// Windows live in LRU tables split across a few mutex-guarded shards. Each
/// check touches exactly one shard, and a full shard drops its least recently
/// seen client on insert. Expired windows are swept periodically.
pub struct InMemoryRateLimiter {
    shards: Vec<Mutex<WindowShard>>,
    hasher: RandomState,
    max_requests: u32,
    window: Duration,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration, max_tracked: usize) -> Self {
        let max_tracked = max_tracked.max(1);
        let shard_count = (max_tracked / MIN_SHARD_CAPACITY).clamp(1, MAX_SHARDS);
        let per_shard =
            NonZeroUsize::new(max_tracked / shard_count).unwrap_or(NonZeroUsize::MIN);

        Self {
            shards: (0..shard_count)
                .map(|_| Mutex::new(LruCache::new(per_shard)))
                .collect(),
            hasher: RandomState::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            config.max_tracked_clients,
        )
    }

    fn shard(&self, client: &str) -> MutexGuard<'_, WindowShard> {
        let index = (self.hasher.hash_one(client) as usize) % self.shards.len();
        lock(&self.shards[index])
    }

    /// Check `client` at an explicit point in time.
    ///
    /// The window update happens under the shard lock, so concurrent requests
    /// from the same client cannot both observe the same count.
    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut shard = self.shard(client);

        if let Some(window) = shard.get_mut(client) {
            return window.admit(now, self.window, self.max_requests);
        }

        let mut window = RateWindow::new(now, self.window);
        let decision = window.admit(now, self.window, self.max_requests);
        if let Some((evicted, _)) = shard.push(client.to_string(), window) {
            tracing::debug!(client = %evicted, "Rate limit table full, evicted a window");
        }
        decision
    }

    /// Drop every window whose reset time has passed. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut shard = lock(shard);
            let expired: Vec<String> = shard
                .iter()
                .filter(|(_, window)| window.is_expired(now))
                .map(|(client, _)| client.clone())
                .collect();

            for client in &expired {
                shard.pop(client);
            }
            removed += expired.len();
        }

        metrics::record_tracked_clients(self.len());
        removed
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| lock(shard).len()).sum()
    }

    /// Run periodic sweeps until shutdown.
    pub async fn run_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep(Instant::now());
                    if removed > 0 {
                        tracing::debug!(
                            removed,
                            remaining = self.len(),
                            "Swept expired rate limit windows"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit sweeper stopping");
                    break;
                }
            }
        }
    }
}

fn lock(shard: &Mutex<WindowShard>) -> MutexGuard<'_, WindowShard> {
    shard.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    fn tracked_clients(&self) -> usize {
        self.len()
    }
}

/// State for the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<dyn RateLimiter>,
    pub trust_forwarded_for: bool,
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identifier(request.headers(), peer, state.trust_forwarded_for);

    match state.limiter.check(&client).await {
        RateDecision::Admitted {
            limit,
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            set_rate_headers(response.headers_mut(), limit, remaining, reset_after);
            response
        }
        RateDecision::Limited { limit, retry_after } => {
            tracing::warn!(client = %client, "Rate limit exceeded");
            metrics::record_rate_limited();
            let mut response = ProxyError::RateLimited {
                retry_after_secs: whole_secs(retry_after),
            }
            .into_response();
            set_rate_headers(response.headers_mut(), limit, 0, retry_after);
            response
        }
    }
}

fn set_rate_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset: Duration) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(whole_secs(reset)));
}

/// Whole seconds until the window resets, never less than one.
fn whole_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}
