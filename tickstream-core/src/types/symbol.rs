//! Symbol type for representing ticker identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Symbol type - used for representing stock ticker identifiers.
///
/// Wraps a `String` value with validation and normalizes to uppercase,
/// so `"aapl"` and `"AAPL"` identify the same subscription.
///
/// # Examples
///
/// ```
/// use tickstream_core::types::Symbol;
///
/// let symbol = Symbol::new("aapl").unwrap();
/// assert_eq!(symbol.as_str(), "AAPL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new `Symbol` from a string, normalizing to uppercase.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptySymbol` if the string is empty.
    /// Returns `ValidationError::InvalidSymbol` if the format is invalid.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        // Tickers may carry an exchange or class suffix, e.g. "BRK.B"
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(ValidationError::InvalidSymbol(s));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Creates a new `Symbol` without validation.
    ///
    /// The caller must ensure the value is already a valid uppercase
    /// ticker.
    #[must_use]
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_new_valid() {
        let symbol = Symbol::new("AAPL").unwrap();
        assert_eq!(symbol.as_str(), "AAPL");
    }

    #[test]
    fn test_symbol_uppercases() {
        let symbol = Symbol::new("msft").unwrap();
        assert_eq!(symbol.as_str(), "MSFT");
    }

    #[test]
    fn test_symbol_class_suffix() {
        let symbol = Symbol::new("brk.b").unwrap();
        assert_eq!(symbol.as_str(), "BRK.B");
    }

    #[test]
    fn test_symbol_new_empty() {
        let result = Symbol::new("");
        assert!(matches!(result, Err(ValidationError::EmptySymbol)));
    }

    #[test]
    fn test_symbol_new_invalid_chars() {
        let result = Symbol::new("AAPL;DROP");
        assert!(matches!(result, Err(ValidationError::InvalidSymbol(_))));
    }

    #[test]
    fn test_symbol_equality_after_normalization() {
        assert_eq!(Symbol::new("aapl").unwrap(), Symbol::new("AAPL").unwrap());
    }

    #[test]
    fn test_symbol_display() {
        let symbol = Symbol::new("TSLA").unwrap();
        assert_eq!(format!("{symbol}"), "TSLA");
    }

    #[test]
    fn test_symbol_serde_roundtrip() {
        let symbol = Symbol::new("NVDA").unwrap();
        let json = serde_json::to_string(&symbol).unwrap();
        assert_eq!(json, "\"NVDA\"");
        let parsed: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(symbol, parsed);
    }
}
