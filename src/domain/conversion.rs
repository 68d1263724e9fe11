//! Conversion records and amount handling.
//!
//! `ConversionModel` is the append-only log entry persisted for every
//! conversion a user performs; `RateModel` is the per-currency record
//! published to the rates collection. Field names are camelCase on the
//! wire so documents stay readable by other clients of the same store.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::currency::{CURRENCIES, RateTable};

/// Errors from parsing user-entered amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount must not be empty")]
    Empty,
    #[error("Amount may only contain digits and '.', found '{0}'")]
    InvalidCharacter(char),
    #[error("'{0}' is not a valid amount")]
    NotANumber(String),
    #[error("Amount is too large")]
    TooLarge,
}

/// Parse an amount typed by the user.
///
/// Only ASCII digits and `.` are accepted, so negative values and
/// exponents never reach the conversion.
pub fn parse_amount(input: &str) -> Result<f64, AmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Empty);
    }

    if let Some(bad) = input.chars().find(|c| !c.is_ascii_digit() && *c != '.') {
        return Err(AmountError::InvalidCharacter(bad));
    }

    let value = input
        .parse::<f64>()
        .map_err(|_| AmountError::NotANumber(input.to_string()))?;
    if !value.is_finite() {
        return Err(AmountError::TooLarge);
    }
    Ok(value)
}

/// Format a value with two decimals, rounding half away from zero.
pub fn format_amount(value: f64) -> String {
    match Decimal::from_f64(value) {
        Some(d) => format!(
            "{:.2}",
            d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        ),
        None => format!("{value:.2}"),
    }
}

/// One persisted conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionModel {
    /// Uid of the signed-in user, empty when nobody was signed in.
    #[serde(default)]
    pub user_id: String,
    /// Creation time (Unix ms).
    pub timestamp: i64,
    /// Amount in the source currency.
    pub amount: f64,
    pub source_currency: String,
    pub target_currency: String,
    /// Amount in the target currency.
    pub result: f64,
}

impl ConversionModel {
    /// Display line, e.g. `100.00 USD equals 92.50 EUR`.
    pub fn summary(&self) -> String {
        format!(
            "{} {} equals {} {}",
            format_amount(self.amount),
            self.source_currency,
            format_amount(self.result),
            self.target_currency
        )
    }

    /// Creation time as a UTC datetime.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

/// Per-currency rate record, keyed by code in the rates collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateModel {
    pub code: String,
    pub name: String,
    /// Multiplier from the base currency to this one.
    pub rate: f64,
}

impl RateModel {
    /// Build one record per catalog currency relative to `base`.
    pub fn catalog(table: &RateTable, base: &str) -> Vec<Self> {
        CURRENCIES
            .iter()
            .map(|c| Self {
                code: c.code.to_string(),
                name: c.name.to_string(),
                rate: table.rate(base, c.code),
            })
            .collect()
    }
}
