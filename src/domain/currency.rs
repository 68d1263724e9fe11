//! Static currency catalog and exchange-rate table.
//!
//! Five currencies and four directed USD-based pairs are compiled into the
//! binary. Lookups resolve in order: identity, direct pair, inverted pair,
//! and finally a silent 1.0 fallback for pairs the table does not know.
//!
//! `RateLookup` reports which branch produced a rate so callers can log
//! fallbacks.

use serde::Serialize;

/// A selectable currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Currency {
    /// ISO 4217 code (e.g. "USD").
    pub code: &'static str,
    /// Human-readable name.
    pub name: &'static str,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}

/// A directed exchange rate: `amount_in_from * rate = amount_in_to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatePair {
    pub from: &'static str,
    pub to: &'static str,
    pub rate: f64,
}

/// Currencies offered for conversion, in display order.
pub const CURRENCIES: [Currency; 5] = [
    Currency { code: "USD", name: "US dollar" },
    Currency { code: "EUR", name: "Euro" },
    Currency { code: "PEN", name: "Peruvian sol" },
    Currency { code: "GBP", name: "Pound sterling" },
    Currency { code: "JPY", name: "Japanese yen" },
];

/// Known exchange rates. Reverse directions are derived by inversion.
pub const RATE_PAIRS: [RatePair; 4] = [
    RatePair { from: "USD", to: "EUR", rate: 0.925 },
    RatePair { from: "USD", to: "PEN", rate: 3.70 },
    RatePair { from: "USD", to: "GBP", rate: 0.79 },
    RatePair { from: "USD", to: "JPY", rate: 151.50 },
];

/// Find a catalog currency by code (case-insensitive).
pub fn find_currency(code: &str) -> Option<&'static Currency> {
    let code = code.trim();
    CURRENCIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

/// Which lookup branch produced a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    /// Source and target are the same currency.
    Identity,
    /// A pair in the requested direction exists.
    Direct,
    /// Only the reverse pair exists; its rate was inverted.
    Inverse,
    /// Neither direction is listed; 1.0 was used.
    Fallback,
}

/// Result of a rate lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLookup {
    pub rate: f64,
    pub source: RateSource,
}

/// Lookup table over a fixed set of directed rate pairs.
#[derive(Debug, Clone, Copy)]
pub struct RateTable {
    pairs: &'static [RatePair],
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(&RATE_PAIRS)
    }
}

impl RateTable {
    /// Create a table over the given pairs.
    pub const fn new(pairs: &'static [RatePair]) -> Self {
        Self { pairs }
    }

    /// The pairs this table was built from.
    pub const fn pairs(&self) -> &'static [RatePair] {
        self.pairs
    }

    /// Resolve the rate from `from` to `to`, reporting the branch taken.
    pub fn lookup(&self, from: &str, to: &str) -> RateLookup {
        if from == to {
            return RateLookup {
                rate: 1.0,
                source: RateSource::Identity,
            };
        }

        if let Some(pair) = self.pairs.iter().find(|p| p.from == from && p.to == to) {
            return RateLookup {
                rate: pair.rate,
                source: RateSource::Direct,
            };
        }

        if let Some(pair) = self.pairs.iter().find(|p| p.from == to && p.to == from) {
            return RateLookup {
                rate: 1.0 / pair.rate,
                source: RateSource::Inverse,
            };
        }

        RateLookup {
            rate: 1.0,
            source: RateSource::Fallback,
        }
    }

    /// Rate from `from` to `to`; unknown pairs yield 1.0.
    pub fn rate(&self, from: &str, to: &str) -> f64 {
        self.lookup(from, to).rate
    }

    /// Convert `amount` from one currency to another.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        amount * self.rate(from, to)
    }
}
