//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that the rate table, amount parsing and
//! display formatting hold their invariants across random inputs.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use currency_converter::domain::{
    AmountError, CURRENCIES, RATE_PAIRS, RateSource, RateTable, format_amount, parse_amount,
};

fn currency_code() -> impl Strategy<Value = &'static str> {
    prop::sample::select(CURRENCIES.iter().map(|c| c.code).collect::<Vec<_>>())
}

fn listed_pair() -> impl Strategy<Value = (&'static str, &'static str, f64)> {
    prop::sample::select(
        RATE_PAIRS
            .iter()
            .map(|p| (p.from, p.to, p.rate))
            .collect::<Vec<_>>(),
    )
}

// ── Rate table properties ───────────────────────────────────

proptest! {
    /// Converting to the same currency returns the amount unchanged.
    #[test]
    fn identity_conversion_is_noop(code in currency_code(), amount in 0.0f64..1e9) {
        let table = RateTable::default();
        prop_assert_eq!(table.convert(amount, code, code), amount);
        prop_assert_eq!(table.lookup(code, code).source, RateSource::Identity);
    }

    /// A listed pair and its inverse multiply to one.
    #[test]
    fn inverse_rate_is_reciprocal((from, to, rate) in listed_pair()) {
        let table = RateTable::default();
        prop_assert_eq!(table.rate(from, to), rate);
        prop_assert_eq!(table.lookup(to, from).source, RateSource::Inverse);

        let product = table.rate(from, to) * table.rate(to, from);
        prop_assert!((product - 1.0).abs() < 1e-12, "product was {product}");
    }

    /// Every rate the table returns is positive, and unlisted pairs fall back to 1.0.
    #[test]
    fn rates_are_positive_and_fallback_is_one(a in currency_code(), b in currency_code()) {
        let table = RateTable::default();
        let lookup = table.lookup(a, b);
        prop_assert!(lookup.rate > 0.0);
        if lookup.source == RateSource::Fallback {
            prop_assert_eq!(lookup.rate, 1.0);
            prop_assert!(a != b);
            prop_assert!(a != "USD" && b != "USD");
        }
    }

    /// Conversion is the amount times the looked-up rate.
    #[test]
    fn convert_is_amount_times_rate(
        a in currency_code(),
        b in currency_code(),
        amount in 0.0f64..1e6,
    ) {
        let table = RateTable::default();
        prop_assert_eq!(table.convert(amount, a, b), amount * table.rate(a, b));
    }
}

// ── Amount input and display properties ─────────────────────

proptest! {
    /// Digit strings with at most one dot always parse.
    #[test]
    fn digit_strings_parse(int in "[0-9]{1,9}", frac in proptest::option::of("[0-9]{0,6}")) {
        let input = match &frac {
            Some(f) => format!("{int}.{f}"),
            None => int.clone(),
        };
        let parsed = parse_amount(&input);
        prop_assert!(parsed.is_ok(), "{input} failed: {parsed:?}");
        prop_assert!(parsed.unwrap() >= 0.0);
    }

    /// Anything containing a character other than digits and '.' is rejected.
    #[test]
    fn foreign_characters_rejected(
        prefix in "[0-9]{0,4}",
        bad in "[a-zA-Z+\\-,]",
        suffix in "[0-9]{1,4}",
    ) {
        let input = format!("{prefix}{bad}{suffix}");
        prop_assert!(parse_amount(&input).is_err());
    }

    /// Digit strings beyond the f64 range are rejected instead of becoming infinity.
    #[test]
    fn overflowing_digit_strings_rejected(lead in "[1-9]", rest in "[0-9]{309,400}") {
        let input = format!("{lead}{rest}");
        prop_assert_eq!(parse_amount(&input), Err(AmountError::TooLarge));
    }

    /// Every accepted amount is finite.
    #[test]
    fn accepted_amounts_are_finite(input in "[0-9]{1,400}(\\.[0-9]{0,8})?") {
        if let Ok(value) = parse_amount(&input) {
            prop_assert!(value.is_finite());
        }
    }

    /// Display always has exactly two decimals.
    #[test]
    fn display_has_two_decimals(value in 0.0f64..1e9) {
        let text = format_amount(value);
        let (_, decimals) = text.split_once('.').unwrap();
        prop_assert_eq!(decimals.len(), 2);
    }

    /// Whole cents print exactly.
    #[test]
    fn whole_cents_round_trip(cents in 0i64..10_000_000) {
        let expected = Decimal::new(cents, 2);
        let text = format_amount(cents as f64 / 100.0);
        prop_assert_eq!(text.parse::<Decimal>().unwrap(), expected);
    }
}

#[test]
fn midpoints_round_away_from_zero() {
    // Exact binary midpoints
    assert_eq!(format_amount(0.125), "0.13");
    assert_eq!(format_amount(0.375), "0.38");
    assert_eq!(format_amount(1.625), "1.63");
    assert_eq!(
        format_amount(100.0 * 0.925).parse::<Decimal>().unwrap(),
        dec!(92.50)
    );
}
