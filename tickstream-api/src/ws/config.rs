//! WebSocket distribution configuration.
//!
//! This module provides configuration for the distribution core including:
//! - Flush and refresh intervals
//! - Outbound queue capacity and inbound frame limits
//! - Keepalive and write deadlines
//! - Inbound flood-control thresholds

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// WebSocket distribution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Update buffer flush interval in milliseconds
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,

    /// Refresh poller interval in milliseconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    /// Maximum number of queued outbound messages per session
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum inbound frame size in bytes
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,

    /// Write deadline in seconds; a timed-out write tears the session down
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    /// Liveness window in seconds; no inbound traffic for this long is
    /// treated as a dead peer
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_secs: u64,

    /// Minimum spacing between inbound messages in milliseconds before the
    /// burst counter starts incrementing
    #[serde(default = "default_min_message_spacing")]
    pub min_message_spacing_ms: u64,

    /// Number of under-spaced messages tolerated before further ones in
    /// the burst are dropped
    #[serde(default = "default_burst_limit")]
    pub burst_limit: u32,

    /// Maximum concurrent upstream fetches issued by the refresh poller
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Grace period for shutdown in seconds
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval(),
            refresh_interval_ms: default_refresh_interval(),
            queue_capacity: default_queue_capacity(),
            max_frame_size: default_max_frame_size(),
            write_timeout_secs: default_write_timeout(),
            liveness_timeout_secs: default_liveness_timeout(),
            min_message_spacing_ms: default_min_message_spacing(),
            burst_limit: default_burst_limit(),
            fetch_concurrency: default_fetch_concurrency(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl WsConfig {
    /// Returns the flush interval as a Duration.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Returns the refresh interval as a Duration.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Returns the write deadline as a Duration.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Returns the liveness window as a Duration.
    #[must_use]
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    /// Returns the keepalive ping interval.
    ///
    /// Must be shorter than the peer's liveness window, so pings go out at
    /// nine tenths of it.
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        self.liveness_timeout() * 9 / 10
    }

    /// Returns the inbound message spacing threshold as a Duration.
    #[must_use]
    pub fn min_message_spacing(&self) -> Duration {
        Duration::from_millis(self.min_message_spacing_ms)
    }

    /// Returns the shutdown grace period as a Duration.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn default_flush_interval() -> u64 {
    500
}

fn default_refresh_interval() -> u64 {
    2000
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_frame_size() -> usize {
    512
}

fn default_write_timeout() -> u64 {
    10
}

fn default_liveness_timeout() -> u64 {
    60
}

fn default_min_message_spacing() -> u64 {
    100
}

fn default_burst_limit() -> u32 {
    10
}

fn default_fetch_concurrency() -> usize {
    5
}

fn default_shutdown_grace() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_config_default() {
        let config = WsConfig::default();
        assert_eq!(config.flush_interval_ms, 500);
        assert_eq!(config.refresh_interval_ms, 2000);
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.max_frame_size, 512);
        assert_eq!(config.burst_limit, 10);
    }

    #[test]
    fn test_ws_config_durations() {
        let config = WsConfig::default();
        assert_eq!(config.flush_interval(), Duration::from_millis(500));
        assert_eq!(config.refresh_interval(), Duration::from_secs(2));
        assert_eq!(config.min_message_spacing(), Duration::from_millis(100));
    }

    #[test]
    fn test_ping_interval_shorter_than_liveness() {
        let config = WsConfig::default();
        assert!(config.ping_interval() < config.liveness_timeout());
        assert_eq!(config.ping_interval(), Duration::from_secs(54));
    }
}
