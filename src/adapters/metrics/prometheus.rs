//! Prometheus Metrics Registry - Converter Observability
//!
//! Counts conversions per currency pair, save outcomes, sign-in
//! outcomes and rate-table fallbacks. Exposed as text on /metrics.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Centralized Prometheus metrics for the converter.
///
/// All metrics follow the naming convention `currency_converter_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Conversions performed, by source/target currency.
    pub conversions: IntCounterVec,
    /// Conversion saves, by outcome (saved/failed).
    pub conversion_saves: IntCounterVec,
    /// Sign-in attempts, by outcome (success/failure/throttled/invalid).
    pub sign_ins: IntCounterVec,
    /// Lookups that fell back to a 1.0 rate.
    pub rate_fallbacks: IntCounter,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let conversions = IntCounterVec::new(
            Opts::new(
                "currency_converter_conversions_total",
                "Total conversions performed",
            ),
            &["source", "target"],
        )?;

        let conversion_saves = IntCounterVec::new(
            Opts::new(
                "currency_converter_conversion_saves_total",
                "Conversion records sent to the document store",
            ),
            &["outcome"],
        )?;

        let sign_ins = IntCounterVec::new(
            Opts::new("currency_converter_sign_ins_total", "Sign-in attempts"),
            &["outcome"],
        )?;

        let rate_fallbacks = IntCounter::new(
            "currency_converter_rate_fallbacks_total",
            "Rate lookups for unlisted pairs that defaulted to 1.0",
        )?;

        registry.register(Box::new(conversions.clone()))?;
        registry.register(Box::new(conversion_saves.clone()))?;
        registry.register(Box::new(sign_ins.clone()))?;
        registry.register(Box::new(rate_fallbacks.clone()))?;

        Ok(Self {
            registry,
            conversions,
            conversion_saves,
            sign_ins,
            rate_fallbacks,
        })
    }

    /// Record a sign-in attempt outcome.
    pub fn record_sign_in(&self, outcome: &str) {
        self.sign_ins.with_label_values(&[outcome]).inc();
    }

    /// Encode all metrics in the Prometheus text format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_exported() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.conversions.with_label_values(&["USD", "EUR"]).inc();
        metrics.record_sign_in("success");
        metrics.rate_fallbacks.inc();

        let text = metrics.encode().unwrap();
        assert!(text.contains("currency_converter_conversions_total{source=\"USD\",target=\"EUR\"} 1"));
        assert!(text.contains("currency_converter_sign_ins_total{outcome=\"success\"} 1"));
        assert!(text.contains("currency_converter_rate_fallbacks_total 1"));
    }
}
