//! Monetary value objects carried by ingested transactions.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::DomainError;

/// A non-negative, finite transaction amount in major currency units.
///
/// Zero is valid (free transactions). The value is kept as reported by the
/// upstream payment source; no rounding to minor units is applied.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "f64", into = "f64")]
#[schema(value_type = f64, example = 100.5)]
pub struct Amount(f64);

impl Amount {
    /// Creates an amount, rejecting negative and non-finite values.
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::NonFiniteAmount);
        }
        if value < 0.0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self(value))
    }

    /// Returns the amount as a float.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for f64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A three-letter uppercase currency code.
///
/// Only the ISO 4217 *shape* is checked; the code is not looked up in a
/// currency list, so `XYZ` is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "USD")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses a currency code.
    pub fn parse(code: &str) -> Result<Self, DomainError> {
        if code.chars().count() != 3 {
            return Err(DomainError::CurrencyLength);
        }
        if !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::CurrencyCase);
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
