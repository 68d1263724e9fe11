//! Domain layer - Currencies, rates and conversion records.
//!
//! Pure logic with no I/O: the static currency catalog, the rate lookup
//! with its inversion rule, and the records persisted by the use cases.
//! Everything here is testable in isolation.

pub mod conversion;
pub mod currency;

// Re-export core types for convenience
pub use conversion::{AmountError, ConversionModel, RateModel, format_amount, parse_amount};
pub use currency::{
    CURRENCIES, Currency, RATE_PAIRS, RateLookup, RatePair, RateSource, RateTable, find_currency,
};
