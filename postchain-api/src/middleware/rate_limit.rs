/// Per-client rate limiting for `/api`
///
/// Token bucket per client IP, held in process memory. A bucket holds
/// `RATE_LIMIT_MAX` tokens and refills continuously so that a full bucket is
/// restored after `RATE_LIMIT_WINDOW_SECS` (default: 100 requests per hour).
///
/// # Algorithm
///
/// - Tokens refill at `capacity / window` per second
/// - Each request consumes 1 token
/// - Request rejected with 429 if the bucket is empty
///
/// # Headers
///
/// - `X-RateLimit-Limit`: bucket capacity
/// - `X-RateLimit-Remaining`: tokens left after this request
/// - `Retry-After`: seconds until a token is available (429 only)
///
/// # Client identity
///
/// The peer address from `ConnectInfo` when the server provides it, else the
/// first `X-Forwarded-For` entry, else a shared `unknown` bucket.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Message sent with 429 responses
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again in an hour!";

/// Buckets kept before idle ones are swept
const SWEEP_THRESHOLD: usize = 10_000;

/// Token bucket state for one client
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, now: Instant) -> Self {
        TokenBucket {
            tokens: f64::from(capacity),
            last_refill: now,
        }
    }

    /// Adds the tokens earned since the last refill
    fn refill(&mut self, rate: f64, capacity: u32, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(f64::from(capacity));
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn seconds_until_available(&self, rate: f64) -> u64 {
        let deficit = 1.0 - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            (deficit / rate).ceil() as u64
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// Whole tokens left
    pub remaining: u32,

    /// Seconds to wait before retrying (0 when allowed)
    pub retry_after: u64,
}

/// In-memory token bucket limiter keyed by client
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    /// Allows `capacity` requests per `window` per client
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window: window.max(Duration::from_secs(1)),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Bucket capacity
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn refill_rate(&self) -> f64 {
        f64::from(self.capacity) / self.window.as_secs_f64()
    }

    /// Consumes one token for `client` at `now`
    pub fn check(&self, client: &str, now: Instant) -> RateLimitDecision {
        let rate = self.refill_rate();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < window);
        }

        let bucket = buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity, now));
        bucket.refill(rate, self.capacity, now);

        let allowed = bucket.try_consume();
        RateLimitDecision {
            allowed,
            remaining: bucket.tokens.floor() as u32,
            retry_after: if allowed {
                0
            } else {
                bucket.seconds_until_available(rate)
            },
        }
    }
}

fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware layer
///
/// # Errors
///
/// - 429 Too Many Requests: bucket empty
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    let decision = state.rate_limiter.check(&client, Instant::now());

    if !decision.allowed {
        tracing::warn!(client = %client, retry_after = decision.retry_after, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: decision.retry_after,
            message: RATE_LIMIT_MESSAGE.to_string(),
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(state.rate_limiter.capacity()),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_bucket_consume_until_empty() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let now = Instant::now();

        let remaining: Vec<u32> = (0..2)
            .map(|_| limiter.check("1.2.3.4", now))
            .inspect(|d| assert!(d.allowed))
            .map(|d| d.remaining)
            .collect();
        assert_eq!(remaining, vec![1, 0]);

        let denied = limiter.check("1.2.3.4", now);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, 5);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check("a", now).allowed);
        assert!(!limiter.check("a", now).allowed);
        assert!(limiter.check("b", now).allowed);
    }

    #[test]
    fn test_refill_over_time() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.check("a", start).allowed);
        assert!(limiter.check("a", start).allowed);
        assert!(!limiter.check("a", start).allowed);

        // 2 tokens per 10s: one token back after 5s
        assert!(limiter.check("a", start + Duration::from_secs(5)).allowed);
        assert!(!limiter.check("a", start + Duration::from_secs(5)).allowed);
    }

    #[test]
    fn test_refill_capped_at_capacity() {
        let mut bucket = TokenBucket {
            tokens: 95.0,
            last_refill: Instant::now(),
        };

        let later = bucket.last_refill + Duration::from_secs(10);
        bucket.refill(1.0, 100, later);
        assert_eq!(bucket.tokens, 100.0);
    }

    #[test]
    fn test_client_key_sources() {
        let request = Request::builder()
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "10.0.0.1");

        let mut request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request), "unknown");

        let addr: SocketAddr = "192.168.1.5:4000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&request), "192.168.1.5");
    }
}
