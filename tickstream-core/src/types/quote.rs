//! Quote snapshot type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Symbol;

/// A timestamped snapshot of a symbol's price fields.
///
/// Immutable once constructed. The short field names on the wire (`c`,
/// `d`, `dp`, `h`, `l`, `o`, `pc`) match the upstream provider's quote
/// payload, so clients see the same shape whether a quote arrives over
/// REST or the WebSocket feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol
    pub symbol: Symbol,
    /// Current price
    #[serde(rename = "c")]
    pub current: f64,
    /// Absolute change since previous close
    #[serde(rename = "d")]
    pub change: f64,
    /// Percent change since previous close
    #[serde(rename = "dp")]
    pub percent_change: f64,
    /// Session high
    #[serde(rename = "h")]
    pub high: f64,
    /// Session low
    #[serde(rename = "l")]
    pub low: f64,
    /// Session open
    #[serde(rename = "o")]
    pub open: f64,
    /// Previous session close
    #[serde(rename = "pc")]
    pub previous_close: f64,
    /// When this snapshot was fetched
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Quote {
        Quote {
            symbol: Symbol::new("AAPL").unwrap(),
            current: 150.0,
            change: 1.5,
            percent_change: 1.01,
            high: 151.2,
            low: 148.3,
            open: 149.0,
            previous_close: 148.5,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_quote_wire_field_names() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"c\":150.0"));
        assert!(json.contains("\"pc\":148.5"));
        assert!(json.contains("\"symbol\":\"AAPL\""));
        assert!(!json.contains("current"));
    }

    #[test]
    fn test_quote_serde_roundtrip() {
        let quote = sample();
        let json = serde_json::to_string(&quote).unwrap();
        let parsed: Quote = serde_json::from_str(&json).unwrap();
        assert_eq!(quote, parsed);
    }
}
