//! Rate limiting middleware.
//!
//! Token-bucket limiting keyed per client (API key header when present,
//! forwarded IP otherwise). Applies to the REST surface; the WebSocket
//! feed has its own per-session inbound flood control.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::{
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::config::RateLimitConfig;
use crate::error::ErrorResponse;
use crate::state::AppState;

/// Rate limiter using the token bucket algorithm.
#[derive(Debug)]
pub struct RateLimiter {
    /// Configuration
    config: RateLimitConfig,
    /// Buckets per client (keyed by IP or API key)
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    /// Creates a new rate limiter.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Checks if a request is allowed for the given client key.
    pub fn check(&self, client_key: &str) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed {
                remaining: u32::MAX,
            };
        }

        let mut bucket = self
            .buckets
            .entry(client_key.to_string())
            .or_insert_with(|| {
                TokenBucket::new(
                    self.config.max_requests + self.config.burst,
                    self.config.max_requests,
                    self.config.window(),
                )
            });

        bucket.try_acquire()
    }

    /// Removes buckets idle for more than two windows.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let window = self.config.window();

        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_update()) < window * 2);
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in the window
        remaining: u32,
    },
    /// Request is denied
    Denied {
        /// When the client can retry
        retry_after: Duration,
    },
}

/// Token bucket for rate limiting.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of tokens
    tokens: Mutex<f64>,
    /// Maximum tokens (capacity)
    capacity: u32,
    /// Refill rate (tokens per window)
    refill_rate: u32,
    /// Window duration
    window: Duration,
    /// Last update time
    last_update: Mutex<Instant>,
}

impl TokenBucket {
    fn new(capacity: u32, refill_rate: u32, window: Duration) -> Self {
        Self {
            tokens: Mutex::new(f64::from(capacity)),
            capacity,
            refill_rate,
            window,
            last_update: Mutex::new(Instant::now()),
        }
    }

    fn try_acquire(&mut self) -> RateLimitResult {
        let now = Instant::now();
        let mut tokens = self.tokens.lock();
        let mut last_update = self.last_update.lock();

        // Refill tokens based on elapsed time
        let elapsed = now.duration_since(*last_update);
        let refill =
            (elapsed.as_secs_f64() / self.window.as_secs_f64()) * f64::from(self.refill_rate);
        *tokens = (*tokens + refill).min(f64::from(self.capacity));
        *last_update = now;
        drop(last_update);

        if *tokens >= 1.0 {
            *tokens -= 1.0;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let remaining = (tokens.max(0.0) as u32).min(self.capacity);
            drop(tokens);
            RateLimitResult::Allowed { remaining }
        } else {
            let tokens_needed = 1.0 - *tokens;
            let time_needed =
                (tokens_needed / f64::from(self.refill_rate)) * self.window.as_secs_f64();
            drop(tokens);
            RateLimitResult::Denied {
                retry_after: Duration::from_secs_f64(time_needed),
            }
        }
    }

    fn last_update(&self) -> Instant {
        *self.last_update.lock()
    }
}

/// Rate limit middleware function.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: axum::middleware::Next,
) -> Response {
    let client_key = extract_client_key(&request);

    match state.rate_limiter.check(&client_key) {
        RateLimitResult::Allowed { remaining } => {
            let mut response = next.run(request).await;

            if let Ok(value) = remaining.to_string().parse() {
                response
                    .headers_mut()
                    .insert("X-RateLimit-Remaining", value);
            }

            response
        }
        RateLimitResult::Denied { retry_after } => rate_limit_exceeded_response(retry_after),
    }
}

/// Extracts the client key from the request.
fn extract_client_key(request: &Request<Body>) -> String {
    // Prefer an API key when the client sends one
    if let Some(api_key) = request
        .headers()
        .get("X-API-Key")
        .and_then(|h| h.to_str().ok())
    {
        return format!("api:{api_key}");
    }

    // Fall back to the forwarded client IP
    if let Some(ip) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return format!("ip:{ip}");
    }

    "unknown".to_string()
}

/// Creates a rate limit exceeded response.
fn rate_limit_exceeded_response(retry_after: Duration) -> Response {
    let body = ErrorResponse {
        status: "error",
        code: "RATE_LIMIT_EXCEEDED",
        message: format!(
            "Rate limit exceeded. Retry after {} seconds.",
            retry_after.as_secs()
        ),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    if let Ok(value) = retry_after.as_secs().to_string().parse() {
        response.headers_mut().insert("Retry-After", value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_requests: 10,
            window_secs: 60,
            burst: 5,
        }
    }

    #[test]
    fn test_rate_limiter_allows_requests() {
        let limiter = RateLimiter::new(test_config());

        let result = limiter.check("client1");
        assert!(matches!(result, RateLimitResult::Allowed { .. }));
    }

    #[test]
    fn test_rate_limiter_exhausts_tokens() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            max_requests: 2,
            window_secs: 60,
            burst: 0,
        });

        let _ = limiter.check("client1");
        let _ = limiter.check("client1");

        let result = limiter.check("client1");
        assert!(matches!(result, RateLimitResult::Denied { .. }));
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            ..test_config()
        });

        for _ in 0..100 {
            let result = limiter.check("client1");
            assert!(matches!(result, RateLimitResult::Allowed { .. }));
        }
    }

    #[test]
    fn test_rate_limiter_separate_clients() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            max_requests: 1,
            window_secs: 60,
            burst: 0,
        });

        let result1 = limiter.check("client1");
        let result2 = limiter.check("client2");

        assert!(matches!(result1, RateLimitResult::Allowed { .. }));
        assert!(matches!(result2, RateLimitResult::Allowed { .. }));
    }

    #[test]
    fn test_extract_client_key_prefers_api_key() {
        let request = Request::builder()
            .header("X-API-Key", "secret")
            .header("X-Forwarded-For", "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_key(&request), "api:secret");
    }

    #[test]
    fn test_extract_client_key_forwarded_ip() {
        let request = Request::builder()
            .header("X-Forwarded-For", "10.0.0.1, 172.16.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_key(&request), "ip:10.0.0.1");
    }

    #[test]
    fn test_extract_client_key_fallback() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_client_key(&request), "unknown");
    }
}
