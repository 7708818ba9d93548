//! Upstream quote source trait.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::{Quote, Symbol};

/// A source of live quotes for ticker symbols.
///
/// Implementations are expected to apply their own upstream rate limiting
/// and caching. The distribution core treats any failure uniformly as
/// "no update this cycle" and retries naturally on the next refresh.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches the latest quote for a symbol.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, FetchError>;
}
