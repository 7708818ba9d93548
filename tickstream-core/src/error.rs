//! Error types for validation, upstream fetches, and caching.

use thiserror::Error;

/// Validation error for core types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Symbol string was empty
    #[error("Symbol must not be empty")]
    EmptySymbol,

    /// Symbol contained invalid characters
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
}

/// Error returned by an upstream quote fetch.
///
/// The distribution core treats every variant uniformly as "no update this
/// cycle"; the variants exist for logging and for the REST layer's status
/// mapping.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection to the provider failed
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure
        reason: String,
    },

    /// Request timed out
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Provider returned a non-success HTTP status
    #[error("HTTP error: status {status_code} - {reason}")]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Reason or response body excerpt
        reason: String,
    },

    /// Provider rate limit was exceeded
    #[error("Provider rate limit exceeded")]
    RateLimited,

    /// Response body could not be parsed
    #[error("Failed to parse provider response: {reason}")]
    Parse {
        /// Reason for the parse failure
        reason: String,
    },
}

impl FetchError {
    /// Returns true if this error is transient and worth retrying on a
    /// later cycle.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::RateLimited => true,
            Self::Http { status_code, .. } => *status_code >= 500,
            Self::Parse { .. } => false,
        }
    }
}

/// Error returned by cache operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key was not present or has expired
    #[error("cache miss")]
    Miss,

    /// Backing store failed
    #[error("cache backend error: {reason}")]
    Backend {
        /// Reason for the backend failure
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let error = FetchError::Http {
            status_code: 429,
            reason: "too many requests".to_string(),
        };
        assert!(error.to_string().contains("429"));
    }

    #[test]
    fn test_fetch_error_recoverable() {
        assert!(
            FetchError::Timeout { timeout_ms: 5000 }.is_recoverable()
        );
        assert!(FetchError::RateLimited.is_recoverable());
        assert!(
            FetchError::Http {
                status_code: 503,
                reason: String::new()
            }
            .is_recoverable()
        );
        assert!(
            !FetchError::Http {
                status_code: 404,
                reason: String::new()
            }
            .is_recoverable()
        );
        assert!(
            !FetchError::Parse {
                reason: "bad json".to_string()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_cache_error_display() {
        assert_eq!(CacheError::Miss.to_string(), "cache miss");
    }
}
