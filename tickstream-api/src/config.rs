//! API configuration types.
//!
//! This module provides configuration for the server including:
//! - Server binding address and port
//! - Upstream provider settings
//! - Rate limiting configuration
//! - CORS settings
//! - WebSocket distribution settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ws::WsConfig;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upstream provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// WebSocket distribution configuration
    #[serde(default)]
    pub websocket: WsConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            provider: ProviderConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            websocket: WsConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Returns the server bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Applies environment variable overrides (`PORT`,
    /// `FINNHUB_API_KEY`), matching the deployment convention.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(key) = std::env::var("FINNHUB_API_KEY") {
            if !key.is_empty() {
                self.provider.api_key = key;
            }
        }
        self
    }
}

/// Upstream quote provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the provider
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the provider API
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Requests per minute allowed against the provider
    #[serde(default = "default_provider_rate_limit")]
    pub rate_limit_per_minute: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_provider_base_url(),
            timeout_secs: default_provider_timeout(),
            rate_limit_per_minute: default_provider_rate_limit(),
        }
    }
}

impl ProviderConfig {
    /// Returns the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Rate limiting configuration for HTTP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum requests per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window duration in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Burst allowance (additional requests allowed in burst)
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            burst: default_burst(),
        }
    }
}

impl RateLimitConfig {
    /// Returns the window duration.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Enable CORS
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Allowed origins (empty means all origins)
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Allow credentials
    #[serde(default)]
    pub allow_credentials: bool,

    /// Max age for preflight cache in seconds
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec![],
            allow_credentials: false,
            max_age_secs: default_max_age(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_provider_base_url() -> String {
    "https://finnhub.io/api/v1".to_string()
}

fn default_provider_timeout() -> u64 {
    30
}

fn default_provider_rate_limit() -> u32 {
    // Free tier allowance
    60
}

fn default_true() -> bool {
    true
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    60
}

fn default_burst() -> u32 {
    20
}

fn default_max_age() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.rate_limit.enabled);
        assert!(config.cors.enabled);
        assert_eq!(config.websocket.flush_interval_ms, 500);
    }

    #[test]
    fn test_bind_address() {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Default::default()
        };
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_provider_config_timeout() {
        let config = ProviderConfig {
            timeout_secs: 5,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_rate_limit_window() {
        let config = RateLimitConfig {
            window_secs: 120,
            ..Default::default()
        };
        assert_eq!(config.window(), Duration::from_secs(120));
    }
}
