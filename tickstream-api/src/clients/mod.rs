//! Upstream data provider clients.

pub mod finnhub;
pub mod rate_limiter;
pub mod types;

pub use finnhub::FinnhubClient;
pub use rate_limiter::UpstreamRateLimiter;
pub use types::{CandleData, CompanyProfile, MarketStatus, NewsItem, SearchResult};
