//! Rate limiter for upstream provider requests.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window rate limiter.
///
/// Tracks request timestamps and makes callers wait until the window has
/// room, pacing outbound calls to the provider's published allowance.
#[derive(Debug)]
pub struct UpstreamRateLimiter {
    /// Maximum requests per window.
    max_requests: u32,
    /// Window duration.
    window: Duration,
    /// Request timestamps.
    timestamps: Mutex<VecDeque<Instant>>,
}

impl UpstreamRateLimiter {
    /// Creates a new rate limiter.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests as usize)),
        }
    }

    /// Creates a rate limiter for requests per minute.
    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Returns the time to wait before the next request can be made.
    #[must_use]
    pub fn wait_time(&self) -> Duration {
        let mut timestamps = self.timestamps.lock();
        let now = Instant::now();

        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_requests as usize {
            if let Some(&oldest) = timestamps.front() {
                let elapsed = now.duration_since(oldest);
                if elapsed < self.window {
                    return self.window - elapsed;
                }
            }
        }

        Duration::ZERO
    }

    /// Records a request unconditionally.
    ///
    /// Use this when you've already waited for the rate limit.
    pub fn record_request(&self) {
        self.timestamps.lock().push_back(Instant::now());
    }

    /// Waits until a request can be made, then records it.
    pub async fn acquire(&self) {
        loop {
            let wait = self.wait_time();
            if wait.is_zero() {
                self.record_request();
                return;
            }
            tokio::time::sleep(wait).await;
        }
    }

    /// Returns the current number of requests in the window.
    #[must_use]
    pub fn current_count(&self) -> usize {
        let mut timestamps = self.timestamps.lock();
        let now = Instant::now();

        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        timestamps.len()
    }
}
