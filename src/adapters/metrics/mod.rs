//! Metrics Adapters - Prometheus and Health Endpoints
//!
//! Counters for conversions, saves and sign-ins, served together with
//! liveness/readiness probes by a small axum server.

pub mod health;
pub mod prometheus;

pub use health::{HealthServer, HealthState};
pub use self::prometheus::MetricsRegistry;
