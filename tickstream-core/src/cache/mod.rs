//! TTL cache trait and implementations.
//!
//! The cache stores raw serialized bytes keyed by string, with a
//! per-entry time-to-live. It sits between the upstream provider client
//! and the network, absorbing repeated requests for the same data.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;

mod memory;

pub use memory::MemoryCache;

/// Time-to-live for cached quotes.
pub const QUOTE_TTL: Duration = Duration::from_secs(60);
/// Time-to-live for cached candle data.
pub const CANDLE_TTL: Duration = Duration::from_secs(5 * 60);
/// Time-to-live for cached company profiles.
pub const PROFILE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Time-to-live for cached news responses.
pub const NEWS_TTL: Duration = Duration::from_secs(15 * 60);
/// Time-to-live for cached symbol searches.
pub const SEARCH_TTL: Duration = Duration::from_secs(60 * 60);

/// Caching operations over serialized values.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Retrieves a value.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Miss` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Stores a value with an expiration.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Removes a value.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Returns true if the key exists and has not expired.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}
