//! Health Check Server - Liveness, Readiness and Metrics
//!
//! Exposes /live, /ready and /metrics via axum 0.7. Readiness flips
//! to 503 once shutdown begins, or while the local data directory is
//! not writable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use super::prometheus::MetricsRegistry;
use crate::adapters::persistence::LocalDocumentStore;

/// Shared state for the health endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Whether the application accepts work.
    pub ready: Arc<AtomicBool>,
    /// Metrics rendered on /metrics.
    pub metrics: Arc<MetricsRegistry>,
    /// Local store whose data directory must stay writable.
    pub local_store: Option<Arc<LocalDocumentStore>>,
}

impl HealthState {
    /// Create a health state (ready by default).
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
            metrics,
            local_store: None,
        }
    }

    /// Also require the local store to be writable before reporting ready.
    pub fn with_local_store(mut self, store: Arc<LocalDocumentStore>) -> Self {
        self.local_store = Some(store);
        self
    }

    /// Mark the application as (not) ready.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    /// Check if the application is ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    /// Shared health state.
    state: HealthState,
    /// Bind address, e.g. 127.0.0.1:9090.
    bind_address: String,
}

impl HealthServer {
    /// Create a new health server.
    pub fn new(state: HealthState, bind_address: &str) -> Self {
        Self {
            state,
            bind_address: bind_address.to_string(),
        }
    }

    /// Build the router (exposed for tests).
    pub fn router(state: HealthState) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::metrics))
            .with_state(state)
    }

    /// Serve until a shutdown signal arrives.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!(address = %self.bind_address, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 503 during shutdown or when the data directory
    /// rejects writes.
    async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
        if !state.is_ready() {
            return (StatusCode::SERVICE_UNAVAILABLE, "NOT READY");
        }
        if let Some(store) = &state.local_store {
            if !store.is_healthy().await {
                warn!("Local data directory is not writable");
                return (StatusCode::SERVICE_UNAVAILABLE, "STORE UNAVAILABLE");
            }
        }
        (StatusCode::OK, "READY")
    }

    /// Prometheus text exposition.
    async fn metrics(State(state): State<HealthState>) -> impl IntoResponse {
        match state.metrics.encode() {
            Ok(text) => (StatusCode::OK, text),
            Err(e) => {
                warn!(error = %e, "Failed to encode metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readiness_follows_state() {
        let state = HealthState::new(Arc::new(MetricsRegistry::new().unwrap()));
        assert!(state.is_ready());

        let ready = HealthServer::readiness(State(state.clone())).await.into_response();
        assert_eq!(ready.status(), StatusCode::OK);

        state.set_ready(false);
        let not_ready = HealthServer::readiness(State(state)).await.into_response();
        assert_eq!(not_ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_readiness_checks_local_store() {
        let dir = std::env::temp_dir().join(format!("health-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(
            LocalDocumentStore::from_data_dir(dir.to_str().unwrap())
                .await
                .unwrap(),
        );
        let state = HealthState::new(Arc::new(MetricsRegistry::new().unwrap()))
            .with_local_store(store);

        let ready = HealthServer::readiness(State(state.clone())).await.into_response();
        assert_eq!(ready.status(), StatusCode::OK);

        // Data directory removed out from under the store
        tokio::fs::remove_dir_all(&dir).await.unwrap();
        let gone = HealthServer::readiness(State(state)).await.into_response();
        assert_eq!(gone.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_text() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        metrics.rate_fallbacks.inc();
        let state = HealthState::new(metrics);

        let response = HealthServer::metrics(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
