//! Finnhub API client.
//!
//! Upstream quote provider with request-level TTL caching and
//! sliding-window rate limiting. Every lookup checks the cache first,
//! then waits for the limiter before going to the network, so burst
//! traffic against the REST API and the refresh poller together stay
//! inside the provider's allowance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use tickstream_core::cache::{self, Cache};
use tickstream_core::error::FetchError;
use tickstream_core::source::QuoteSource;
use tickstream_core::types::{Quote, Symbol};

use super::rate_limiter::UpstreamRateLimiter;
use super::types::{CandleData, CompanyProfile, NewsItem, SearchResult};
use crate::config::ProviderConfig;

/// Maximum news items returned per request.
const NEWS_LIMIT: usize = 10;
/// Maximum search results returned per request.
const SEARCH_LIMIT: usize = 20;

/// Client for the Finnhub REST API.
pub struct FinnhubClient {
    config: ProviderConfig,
    http: reqwest::Client,
    limiter: UpstreamRateLimiter,
    cache: Arc<dyn Cache>,
}

impl FinnhubClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::ConnectionFailed` if the HTTP client cannot
    /// be constructed.
    pub fn new(config: ProviderConfig, cache: Arc<dyn Cache>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::ConnectionFailed {
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        let limiter = UpstreamRateLimiter::per_minute(config.rate_limit_per_minute);

        Ok(Self {
            config,
            http,
            limiter,
            cache,
        })
    }

    /// Fetches the latest quote for a symbol.
    pub async fn quote(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
        let cache_key = format!("quote:{symbol}");
        if let Some(quote) = self.cache_get(&cache_key).await {
            return Ok(quote);
        }

        let body = self
            .get_json("/quote", &[("symbol", symbol.as_str())])
            .await?;
        let quote = parse_quote(symbol, &body);

        self.cache_put(&cache_key, &quote, cache::QUOTE_TTL).await;
        Ok(quote)
    }

    /// Fetches candlestick data for a symbol.
    pub async fn candles(
        &self,
        symbol: &Symbol,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<CandleData, FetchError> {
        let cache_key = format!("candles:{symbol}:{resolution}:{from}:{to}");
        if let Some(candles) = self.cache_get(&cache_key).await {
            return Ok(candles);
        }

        let body = self
            .get_json(
                "/stock/candle",
                &[
                    ("symbol", symbol.as_str()),
                    ("resolution", resolution),
                    ("from", &from.to_string()),
                    ("to", &to.to_string()),
                ],
            )
            .await?;
        let mut candles: CandleData =
            serde_json::from_value(body).map_err(|e| FetchError::Parse {
                reason: e.to_string(),
            })?;
        candles.symbol = symbol.to_string();

        self.cache_put(&cache_key, &candles, cache::CANDLE_TTL).await;
        Ok(candles)
    }

    /// Fetches the company profile for a symbol.
    pub async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, FetchError> {
        let cache_key = format!("profile:{symbol}");
        if let Some(profile) = self.cache_get(&cache_key).await {
            return Ok(profile);
        }

        let body = self
            .get_json("/stock/profile2", &[("symbol", symbol.as_str())])
            .await?;
        let mut profile: CompanyProfile =
            serde_json::from_value(body).map_err(|e| FetchError::Parse {
                reason: e.to_string(),
            })?;
        profile.symbol = symbol.to_string();

        self.cache_put(&cache_key, &profile, cache::PROFILE_TTL).await;
        Ok(profile)
    }

    /// Fetches recent company news for a symbol.
    pub async fn news(
        &self,
        symbol: &Symbol,
        from: &str,
        to: &str,
    ) -> Result<Vec<NewsItem>, FetchError> {
        let cache_key = format!("news:{symbol}:{from}:{to}");
        if let Some(news) = self.cache_get(&cache_key).await {
            return Ok(news);
        }

        let body = self
            .get_json(
                "/company-news",
                &[("symbol", symbol.as_str()), ("from", from), ("to", to)],
            )
            .await?;
        let items = body.as_array().map_or_else(Vec::new, |articles| {
            map_news(symbol.as_str(), articles)
        });

        self.cache_put(&cache_key, &items, cache::NEWS_TTL).await;
        Ok(items)
    }

    /// Searches for symbols matching a query.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, FetchError> {
        let cache_key = format!("search:{query}");
        if let Some(results) = self.cache_get(&cache_key).await {
            return Ok(results);
        }

        let body = self.get_json("/search", &[("q", query)]).await?;
        let results = map_search(&body);

        self.cache_put(&cache_key, &results, cache::SEARCH_TTL).await;
        Ok(results)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        self.limiter.acquire().await;

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(%url, "provider request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("token", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        timeout_ms: self.config.timeout_secs * 1000,
                    }
                } else {
                    FetchError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status_code: status.as_u16(),
                reason: body,
            });
        }

        response.json().await.map_err(|e| FetchError::Parse {
            reason: e.to_string(),
        })
    }

    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.cache.get(key).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn cache_put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            let _ = self.cache.set(key, bytes, ttl).await;
        }
    }
}

#[async_trait]
impl QuoteSource for FinnhubClient {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
        self.quote(symbol).await
    }
}

/// Maps the provider's quote body into a `Quote` snapshot.
///
/// Missing or non-numeric fields default to zero, matching the
/// provider's behavior for unknown symbols.
fn parse_quote(symbol: &Symbol, body: &Value) -> Quote {
    Quote {
        symbol: symbol.clone(),
        current: get_f64(body, "c"),
        change: get_f64(body, "d"),
        percent_change: get_f64(body, "dp"),
        high: get_f64(body, "h"),
        low: get_f64(body, "l"),
        open: get_f64(body, "o"),
        previous_close: get_f64(body, "pc"),
        timestamp: Utc::now(),
    }
}

fn map_news(symbol: &str, articles: &[Value]) -> Vec<NewsItem> {
    articles
        .iter()
        .take(NEWS_LIMIT)
        .enumerate()
        .map(|(i, article)| NewsItem {
            id: format!("{symbol}-{i}"),
            headline: get_str(article, "headline"),
            summary: get_str(article, "summary"),
            source: get_str(article, "source"),
            url: get_str(article, "url"),
            image: get_str(article, "image"),
            datetime: parse_unix_time(get_f64(article, "datetime")),
            symbol: symbol.to_string(),
        })
        .collect()
}

fn map_search(body: &Value) -> Vec<SearchResult> {
    body.get("result")
        .and_then(Value::as_array)
        .map_or_else(Vec::new, |results| {
            results
                .iter()
                .take(SEARCH_LIMIT)
                .map(|item| SearchResult {
                    symbol: get_str(item, "symbol"),
                    description: get_str(item, "description"),
                    kind: get_str(item, "type"),
                })
                .collect()
        })
}

#[allow(clippy::cast_possible_truncation)]
fn parse_unix_time(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds as i64, 0).unwrap_or_else(Utc::now)
}

fn get_f64(body: &Value, key: &str) -> f64 {
    match body.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn get_str(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quote_maps_provider_fields() {
        let symbol = Symbol::new("AAPL").unwrap();
        let body = json!({
            "c": 150.25,
            "d": 1.25,
            "dp": 0.84,
            "h": 151.0,
            "l": 148.9,
            "o": 149.3,
            "pc": 149.0
        });

        let quote = parse_quote(&symbol, &body);
        assert_eq!(quote.symbol, symbol);
        assert!((quote.current - 150.25).abs() < f64::EPSILON);
        assert!((quote.previous_close - 149.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_quote_missing_fields_default_to_zero() {
        let symbol = Symbol::new("ZZZZ").unwrap();
        let quote = parse_quote(&symbol, &json!({}));
        assert!((quote.current - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_quote_string_numbers() {
        let symbol = Symbol::new("AAPL").unwrap();
        let quote = parse_quote(&symbol, &json!({"c": "150.5"}));
        assert!((quote.current - 150.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_map_news_caps_items() {
        let articles: Vec<Value> = (0..25)
            .map(|i| {
                json!({
                    "headline": format!("headline {i}"),
                    "summary": "s",
                    "source": "wire",
                    "url": "https://example.com",
                    "image": "",
                    "datetime": 1_700_000_000.0
                })
            })
            .collect();

        let items = map_news("AAPL", &articles);
        assert_eq!(items.len(), NEWS_LIMIT);
        assert_eq!(items[0].id, "AAPL-0");
        assert_eq!(items[0].symbol, "AAPL");
    }

    #[test]
    fn test_map_search_caps_results() {
        let results: Vec<Value> = (0..30)
            .map(|i| {
                json!({
                    "symbol": format!("SYM{i}"),
                    "description": "desc",
                    "type": "Common Stock"
                })
            })
            .collect();

        let mapped = map_search(&json!({ "result": results }));
        assert_eq!(mapped.len(), SEARCH_LIMIT);
        assert_eq!(mapped[0].symbol, "SYM0");
    }

    #[test]
    fn test_map_search_missing_result_key() {
        assert!(map_search(&json!({})).is_empty());
    }
}
