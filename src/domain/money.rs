//! Integer money amounts in a currency's minor unit.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Currencies with no minor unit (amounts are whole numbers on the wire).
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["JPY", "KRW", "UGX", "RWF", "XAF", "XOF", "VND", "CLP"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    pub minor: i64,
    pub currency: String,
}

/// Normalizes and checks an ISO-4217 style code.
pub fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!(
            "currency must be a 3-letter code, got '{}'",
            code
        )));
    }
    Ok(code)
}

pub fn exponent(currency: &str) -> u32 {
    if ZERO_DECIMAL_CURRENCIES.contains(&currency) {
        0
    } else {
        2
    }
}

impl Money {
    pub fn new(minor: i64, currency: &str) -> Result<Self> {
        if minor < 0 {
            return Err(AppError::Validation("amount must not be negative".to_string()));
        }
        Ok(Self {
            minor,
            currency: normalize_currency(currency)?,
        })
    }

    /// Parses a decimal string such as `"12.50"` (or `"1000"` for UGX).
    pub fn parse_decimal(value: &str, currency: &str) -> Result<Self> {
        let currency = normalize_currency(currency)?;
        let exp = exponent(&currency);
        let value = value.trim();
        let invalid = || AppError::Validation(format!("invalid amount '{}' for {}", value, currency));

        let (whole, frac) = match value.split_once('.') {
            Some((w, f)) => (w, f),
            None => (value, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac.chars().all(|c| c.is_ascii_digit()) || frac.len() > exp as usize {
            return Err(invalid());
        }
        if value.ends_with('.') {
            return Err(invalid());
        }

        let scale = 10i64.pow(exp);
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let mut frac_minor: i64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid())?
        };
        for _ in frac.len()..exp as usize {
            frac_minor *= 10;
        }
        let minor = whole
            .checked_mul(scale)
            .and_then(|m| m.checked_add(frac_minor))
            .ok_or_else(invalid)?;
        Ok(Self { minor, currency })
    }

    /// Decimal rendering used in gateway payloads.
    pub fn to_decimal_string(&self) -> String {
        let exp = exponent(&self.currency);
        if exp == 0 {
            return self.minor.to_string();
        }
        let scale = 10i64.pow(exp);
        format!(
            "{}.{:0width$}",
            self.minor / scale,
            self.minor % scale,
            width = exp as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_decimal_amounts() {
        assert_eq!(Money::parse_decimal("12.50", "usd").unwrap().minor, 1250);
        assert_eq!(Money::parse_decimal("12.5", "USD").unwrap().minor, 1250);
        assert_eq!(Money::parse_decimal("7", "EUR").unwrap().minor, 700);
        assert_eq!(Money::parse_decimal("0.05", "EUR").unwrap().minor, 5);
    }

    #[test]
    fn zero_decimal_currencies_reject_fractions() {
        assert_eq!(Money::parse_decimal("5000", "UGX").unwrap().minor, 5000);
        assert!(Money::parse_decimal("5000.5", "UGX").is_err());
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", "-1.00", "1.234", "abc", "1.", ".5", "1,00"] {
            assert!(Money::parse_decimal(bad, "USD").is_err(), "accepted '{}'", bad);
        }
        assert!(Money::parse_decimal("1.00", "US").is_err());
    }

    #[test]
    fn renders_decimal_strings() {
        assert_eq!(Money::new(1250, "USD").unwrap().to_decimal_string(), "12.50");
        assert_eq!(Money::new(5, "USD").unwrap().to_decimal_string(), "0.05");
        assert_eq!(Money::new(3000, "UGX").unwrap().to_decimal_string(), "3000");
    }
}
