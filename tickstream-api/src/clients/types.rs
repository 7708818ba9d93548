//! REST payload models for the upstream provider.
//!
//! Field names mirror the provider's JSON so responses pass through to
//! clients unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candlestick data for a symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandleData {
    /// Ticker symbol
    #[serde(default)]
    pub symbol: String,
    /// Close prices
    #[serde(rename = "c", default)]
    pub close: Vec<f64>,
    /// High prices
    #[serde(rename = "h", default)]
    pub high: Vec<f64>,
    /// Low prices
    #[serde(rename = "l", default)]
    pub low: Vec<f64>,
    /// Open prices
    #[serde(rename = "o", default)]
    pub open: Vec<f64>,
    /// Volumes
    #[serde(rename = "v", default)]
    pub volume: Vec<i64>,
    /// Unix timestamps
    #[serde(rename = "t", default)]
    pub timestamps: Vec<i64>,
    /// Response status (`ok` or `no_data`)
    #[serde(rename = "s", default)]
    pub status: String,
}

/// Company profile information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Ticker symbol
    #[serde(default)]
    pub symbol: String,
    /// Company name
    #[serde(default)]
    pub name: String,
    /// Listing exchange
    #[serde(default)]
    pub exchange: String,
    /// Industry classification
    #[serde(rename = "finnhubIndustry", default)]
    pub industry: String,
    /// Market capitalization
    #[serde(rename = "marketCapitalization", default)]
    pub market_capitalization: f64,
    /// Shares outstanding
    #[serde(rename = "shareOutstanding", default)]
    pub share_outstanding: f64,
    /// Logo URL
    #[serde(default)]
    pub logo: String,
    /// Company web URL
    #[serde(rename = "weburl", default)]
    pub web_url: String,
}

/// A news article about a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    /// Synthetic item id
    pub id: String,
    /// Headline
    pub headline: String,
    /// Summary
    pub summary: String,
    /// Source publication
    pub source: String,
    /// Article URL
    pub url: String,
    /// Image URL
    pub image: String,
    /// Publication time
    pub datetime: DateTime<Utc>,
    /// Related ticker symbol
    pub symbol: String,
}

/// A symbol search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Ticker symbol
    pub symbol: String,
    /// Instrument description
    pub description: String,
    /// Instrument type
    #[serde(rename = "type")]
    pub kind: String,
}

/// Market status information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStatus {
    /// Exchange identifier
    pub exchange: String,
    /// Holiday name, empty when none
    pub holiday: String,
    /// Whether the market is currently open
    #[serde(rename = "isOpen")]
    pub is_open: bool,
    /// Current trading session
    pub session: String,
    /// Exchange timezone
    pub timezone: String,
    /// Unix timestamp
    #[serde(rename = "t")]
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_data_provider_shape() {
        let json = r#"{"c":[150.0,151.0],"h":[152.0,153.0],"l":[149.0,150.0],"o":[149.5,150.5],"v":[1000,1100],"t":[1700000000,1700000060],"s":"ok"}"#;
        let candles: CandleData = serde_json::from_str(json).unwrap();
        assert_eq!(candles.close, vec![150.0, 151.0]);
        assert_eq!(candles.status, "ok");
        assert!(candles.symbol.is_empty());
    }

    #[test]
    fn test_company_profile_renamed_fields() {
        let json = r#"{"name":"Apple Inc","exchange":"NASDAQ","finnhubIndustry":"Technology","marketCapitalization":3000000.0,"shareOutstanding":15000.0,"logo":"","weburl":"https://apple.com"}"#;
        let profile: CompanyProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.industry, "Technology");
        assert_eq!(profile.web_url, "https://apple.com");
    }

    #[test]
    fn test_search_result_type_field() {
        let result = SearchResult {
            symbol: "AAPL".to_string(),
            description: "APPLE INC".to_string(),
            kind: "Common Stock".to_string(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""type":"Common Stock""#));
    }
}
