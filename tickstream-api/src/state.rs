//! Application state for the API server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clients::FinnhubClient;
use crate::config::ApiConfig;
use crate::middleware::RateLimiter;
use crate::ws::CoordinatorHandle;

/// Shared application state.
pub struct AppState {
    /// API configuration
    pub config: ApiConfig,
    /// Upstream provider client
    pub provider: Arc<FinnhubClient>,
    /// Handle to the distribution coordinator
    pub coordinator: CoordinatorHandle,
    /// Rate limiter for the REST surface
    pub rate_limiter: Arc<RateLimiter>,
    /// Process start time, for uptime reporting
    started_at: Instant,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        provider: Arc<FinnhubClient>,
        coordinator: CoordinatorHandle,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Self {
            config,
            provider,
            coordinator,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// Returns how long the server has been up.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
