//! Per-client token-bucket request-rate limiting for the catalog routes.
//!
//! The similarity ranking is O(n²) per request, so callers are bounded here
//! rather than inside the ranking code. Buckets are keyed by the peer IP
//! taken from `ConnectInfo<SocketAddr>`; the server must be started with
//! `into_make_service_with_connect_info`. Requests without connection info
//! share one bucket. `/health` is mounted outside this layer.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

/// Upper bound on tracked clients; full buckets are evicted first when reached.
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    refill_per_sec: f64,
    capacity: f64,
    max_clients: usize,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

#[derive(Debug, Serialize)]
struct RateLimitedBody {
    error: &'static str,
    message: &'static str,
    retry_after_secs: u64,
}

impl RateLimiter {
    pub fn new(rate_per_sec: u32, burst: u32) -> Arc<Self> {
        Arc::new(Self::with_max_clients(rate_per_sec, burst, MAX_TRACKED_CLIENTS))
    }

    fn with_max_clients(rate_per_sec: u32, burst: u32, max_clients: usize) -> Self {
        Self {
            refill_per_sec: f64::from(rate_per_sec.max(1)),
            capacity: f64::from(burst.max(1)),
            max_clients: max_clients.max(1),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token from `client`'s bucket if available.
    pub fn try_acquire(&self, client: IpAddr) -> bool {
        self.try_acquire_at(client, Instant::now())
    }

    fn try_acquire_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if !buckets.contains_key(&client) && buckets.len() >= self.max_clients {
            self.evict(&mut buckets, now);
        }

        let bucket =
            buckets.entry(client).or_insert(Bucket { tokens: self.capacity, last_refill: now });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets that have refilled to capacity, since a fresh bucket is
    /// identical. If every client is still mid-burst, drop the longest idle one.
    fn evict(&self, buckets: &mut HashMap<IpAddr, Bucket>, now: Instant) {
        buckets.retain(|_, bucket| {
            let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens + elapsed * self.refill_per_sec < self.capacity
        });

        if buckets.len() >= self.max_clients {
            let idlest =
                buckets.iter().min_by_key(|(_, bucket)| bucket.last_refill).map(|(client, _)| *client);
            if let Some(client) = idlest {
                buckets.remove(&client);
            }
        }
    }

    fn tracked_clients(&self) -> usize {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn retry_after_secs(&self) -> u64 {
        (1.0 / self.refill_per_sec).ceil().max(1.0) as u64
    }
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip())
        .unwrap_or(UNKNOWN_CLIENT)
}

pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);
    if limiter.try_acquire(client) {
        return next.run(request).await;
    }

    let retry_after_secs = limiter.retry_after_secs();
    warn!(
        event_name = "system.server.rate_limited",
        path = %request.uri().path(),
        client = %client,
        tracked_clients = limiter.tracked_clients(),
        retry_after_secs,
        "request rejected by rate limiter"
    );

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitedBody {
            error: "rate_limited",
            message: "Too many requests. Please retry shortly.",
            retry_after_secs,
        }),
    )
        .into_response();
    response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}
