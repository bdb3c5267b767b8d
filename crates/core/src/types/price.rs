//! Type-safe price representation using decimal arithmetic.
//!
//! The commerce backend returns every monetary value as a price object:
//!
//! ```json
//! {
//!   "raw": 35,
//!   "formatted": "35.00",
//!   "formatted_with_symbol": "$35.00",
//!   "formatted_with_code": "35.00 USD"
//! }
//! ```
//!
//! `raw` is decoded into a [`Decimal`] so totals never pass through floats.
//! The formatted strings are kept verbatim; the server is authoritative for
//! presentation as well as for arithmetic.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A monetary value as reported by the commerce backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub raw: Decimal,
    /// Amount formatted without symbol (e.g., "35.00").
    #[serde(default)]
    pub formatted: String,
    /// Amount formatted with currency symbol (e.g., "$35.00").
    #[serde(default)]
    pub formatted_with_symbol: String,
    /// Amount formatted with currency code (e.g., "35.00 USD").
    #[serde(default)]
    pub formatted_with_code: String,
}

impl Money {
    /// Build a price object from a raw amount, formatting it locally.
    ///
    /// Only used by backends that have to produce prices themselves; values
    /// received from the server are never re-formatted.
    #[must_use]
    pub fn from_raw(raw: Decimal, currency: CurrencyCode) -> Self {
        let rounded = raw.round_dp(2);
        let formatted = format!("{rounded:.2}");
        Self {
            raw,
            formatted_with_symbol: format!("{}{formatted}", currency.symbol()),
            formatted_with_code: format!("{formatted} {}", currency.code()),
            formatted,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub fn zero(currency: CurrencyCode) -> Self {
        Self::from_raw(Decimal::ZERO, currency)
    }
}

/// Error parsing a currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("unsupported currency code: {0}")]
    UnsupportedCurrency(String),
}

/// ISO 4217 currency codes supported by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(MoneyError::UnsupportedCurrency(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_raw_formats_two_places() {
        let money = Money::from_raw(Decimal::new(35, 0), CurrencyCode::USD);
        assert_eq!(money.formatted, "35.00");
        assert_eq!(money.formatted_with_symbol, "$35.00");
        assert_eq!(money.formatted_with_code, "35.00 USD");
    }

    #[test]
    fn test_money_deserializes_numeric_raw() {
        let money: Money = serde_json::from_value(serde_json::json!({
            "raw": 19.5,
            "formatted": "19.50",
            "formatted_with_symbol": "£19.50",
            "formatted_with_code": "19.50 GBP"
        }))
        .unwrap();
        assert_eq!(money.raw, Decimal::new(195, 1));
        assert_eq!(money.formatted_with_symbol, "£19.50");
    }

    #[test]
    fn test_money_missing_formats_default_empty() {
        let money: Money = serde_json::from_value(serde_json::json!({ "raw": 0 })).unwrap();
        assert_eq!(money.raw, Decimal::ZERO);
        assert!(money.formatted.is_empty());
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("EUR".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!(matches!(
            "XYZ".parse::<CurrencyCode>(),
            Err(MoneyError::UnsupportedCurrency(_))
        ));
    }
}
