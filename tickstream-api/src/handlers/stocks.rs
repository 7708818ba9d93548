//! Stock data handlers.
//!
//! REST endpoints backed by the upstream provider client. Symbols are
//! validated and uppercased on the way in; provider failures map to
//! gateway-class errors.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{Datelike, Duration as ChronoDuration, Local, Timelike, Utc, Weekday};
use futures::StreamExt;
use futures::stream;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use tickstream_core::types::{Quote, Symbol};

use crate::clients::types::MarketStatus;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Maximum symbols accepted by the batch quote endpoint.
const BATCH_LIMIT: usize = 50;
/// Concurrent provider fetches for a batch request.
const BATCH_CONCURRENCY: usize = 5;

fn parse_symbol(raw: &str) -> ApiResult<Symbol> {
    Symbol::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Single quote handler.
///
/// GET /api/v1/stocks/quote/{symbol}
pub async fn get_quote(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let symbol = parse_symbol(&symbol)?;
    let quote = state.provider.quote(&symbol).await?;

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=60")],
        Json(quote),
    ))
}

/// Query parameters for the batch quote endpoint.
#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    /// Comma-separated ticker symbols
    pub symbols: String,
}

/// Batch quote handler.
///
/// GET /api/v1/stocks/quotes/batch?symbols=AAPL,MSFT,GOOGL
///
/// Symbols that fail to fetch are omitted from the result rather than
/// failing the whole batch.
pub async fn get_batch_quotes(
    Query(query): Query<BatchQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<ApiResponse<HashMap<String, Quote>>> {
    let symbols: Vec<Symbol> = query
        .symbols
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_symbol)
        .collect::<ApiResult<_>>()?;

    if symbols.is_empty() {
        return Err(ApiError::BadRequest("symbols parameter is required".to_string()));
    }
    if symbols.len() > BATCH_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "Maximum {BATCH_LIMIT} symbols allowed"
        )));
    }

    let requested = symbols.len();
    let quotes: HashMap<String, Quote> = stream::iter(symbols)
        .map(|symbol| {
            let provider = state.provider.clone();
            async move {
                let quote = provider.quote(&symbol).await.ok()?;
                Some((symbol.to_string(), quote))
            }
        })
        .buffer_unordered(BATCH_CONCURRENCY)
        .filter_map(|entry| async move { entry })
        .collect()
        .await;

    if quotes.len() < requested {
        let missing = requested - quotes.len();
        return Ok(ApiResponse::success_with_message(
            quotes,
            format!("{missing} symbol(s) could not be fetched"),
        ));
    }
    Ok(ApiResponse::success(quotes))
}

/// Query parameters for the candles endpoint.
#[derive(Debug, Deserialize)]
pub struct CandleQuery {
    /// Candle resolution (`1`, `5`, `15`, `30`, `60`, `D`, `W`, `M`)
    pub resolution: Option<String>,
    /// Range start as unix seconds
    pub from: Option<i64>,
    /// Range end as unix seconds
    pub to: Option<i64>,
}

/// Candlestick data handler.
///
/// GET /api/v1/stocks/{symbol}/candles?resolution=D&from=...&to=...
pub async fn get_candles(
    Path(symbol): Path<String>,
    Query(query): Query<CandleQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let symbol = parse_symbol(&symbol)?;
    let resolution = query.resolution.unwrap_or_else(|| "D".to_string());
    let to = query.to.unwrap_or_else(|| Utc::now().timestamp());
    let from = query
        .from
        .unwrap_or_else(|| (Utc::now() - ChronoDuration::days(30)).timestamp());

    if from >= to {
        return Err(ApiError::BadRequest(
            "from must be earlier than to".to_string(),
        ));
    }

    let candles = state
        .provider
        .candles(&symbol, &resolution, from, to)
        .await?;

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(candles),
    ))
}

/// Company profile handler.
///
/// GET /api/v1/stocks/{symbol}/profile
pub async fn get_profile(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let symbol = parse_symbol(&symbol)?;
    let profile = state.provider.profile(&symbol).await?;

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=3600")],
        Json(profile),
    ))
}

/// Query parameters for the news endpoint.
#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    /// Range start (`YYYY-MM-DD`)
    pub from: Option<String>,
    /// Range end (`YYYY-MM-DD`)
    pub to: Option<String>,
}

/// Company news handler.
///
/// GET /api/v1/stocks/{symbol}/news?from=...&to=...
pub async fn get_news(
    Path(symbol): Path<String>,
    Query(query): Query<NewsQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let symbol = parse_symbol(&symbol)?;
    let to = query
        .to
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
    let from = query.from.unwrap_or_else(|| {
        (Utc::now() - ChronoDuration::days(7))
            .format("%Y-%m-%d")
            .to_string()
    });

    let news = state.provider.news(&symbol, &from, &to).await?;
    Ok(Json(news))
}

/// Query parameters for the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string
    pub q: String,
}

/// Symbol search handler.
///
/// GET /api/v1/search/stocks?q=apple
pub async fn search_stocks(
    Query(query): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    if query.q.trim().is_empty() {
        return Err(ApiError::BadRequest("q parameter is required".to_string()));
    }

    let results = state.provider.search(query.q.trim()).await?;
    Ok(Json(results))
}

/// Market status handler.
///
/// GET /api/v1/market/status
pub async fn get_market_status() -> impl IntoResponse {
    // Simplified clock-based session classification; no holiday calendar
    let now = Local::now();
    let status = MarketStatus {
        exchange: "US".to_string(),
        holiday: String::new(),
        is_open: is_market_open(now.hour(), now.weekday()),
        session: market_session(now.hour(), now.weekday()).to_string(),
        timezone: "America/New_York".to_string(),
        timestamp: Utc::now().timestamp(),
    };

    (
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(status),
    )
}

fn is_market_open(hour: u32, weekday: Weekday) -> bool {
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        return false;
    }
    (9..16).contains(&hour)
}

fn market_session(hour: u32, weekday: Weekday) -> &'static str {
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        return "closed";
    }
    match hour {
        0..=3 => "closed",
        4..=8 => "pre-market",
        9..=15 => "market",
        16..=19 => "after-hours",
        _ => "closed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_closed_on_weekends() {
        assert!(!is_market_open(10, Weekday::Sat));
        assert!(!is_market_open(10, Weekday::Sun));
        assert_eq!(market_session(10, Weekday::Sat), "closed");
    }

    #[test]
    fn test_market_open_weekday_hours() {
        assert!(is_market_open(9, Weekday::Mon));
        assert!(is_market_open(15, Weekday::Fri));
        assert!(!is_market_open(8, Weekday::Mon));
        assert!(!is_market_open(16, Weekday::Mon));
    }

    #[test]
    fn test_market_session_classification() {
        assert_eq!(market_session(2, Weekday::Tue), "closed");
        assert_eq!(market_session(5, Weekday::Tue), "pre-market");
        assert_eq!(market_session(10, Weekday::Tue), "market");
        assert_eq!(market_session(17, Weekday::Tue), "after-hours");
        assert_eq!(market_session(21, Weekday::Tue), "closed");
    }

    #[test]
    fn test_parse_symbol_rejects_invalid() {
        assert!(parse_symbol("AAPL").is_ok());
        assert!(parse_symbol("").is_err());
        assert!(parse_symbol("A APL").is_err());
    }
}
