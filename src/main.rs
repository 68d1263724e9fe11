//! Currency Converter - Entry Point
//!
//! Wiring sequence:
//! 1. Load .env, then config.toml (path from `CONVERTER_CONFIG`) + validate
//! 2. Init tracing (JSON structured logging on stderr)
//! 3. Build the identity provider (Firebase or local accounts)
//! 4. Build the document store (Firestore or local files)
//! 5. Spawn the health/metrics server if enabled
//! 6. Publish the rate catalog if configured
//! 7. Run the terminal front-end until `q`, end of input or SIGINT

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use currency_converter::adapters::firebase::{FirebaseAuth, FirebaseClient, FirebaseClientConfig, FirestoreStore};
use currency_converter::adapters::local::LocalAccounts;
use currency_converter::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use currency_converter::adapters::persistence::{LocalDocumentStore, SessionFile};
use currency_converter::adapters::terminal::TerminalApp;
use currency_converter::config::{self, AppConfig, AuthProviderKind, StoreBackendKind};
use currency_converter::domain::RateTable;
use currency_converter::ports::document_store::DocumentStore;
use currency_converter::ports::identity::IdentityProvider;
use currency_converter::usecases::{ConversionService, RateCatalog, SessionManager};

/// Env var naming the config file.
const CONFIG_ENV: &str = "CONVERTER_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load .env and configuration ──────────────────────
    dotenvy::dotenv().ok();
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;

    // ── 2. Initialize structured JSON logging ───────────────
    // stdout belongs to the terminal screens
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        auth = ?config.auth.provider,
        store = ?config.store.backend,
        "Starting currency converter"
    );

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);
    let client = Arc::new(
        FirebaseClient::new(FirebaseClientConfig::from(&config.api))
            .context("Failed to create HTTP client")?,
    );

    // ── 3. Identity provider ────────────────────────────────
    let (identity, firebase_auth) = build_identity(&config, Arc::clone(&client)).await?;

    // ── 4. Document store ───────────────────────────────────
    let mut local_store = None;
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackendKind::Firestore => {
            let mut firestore = FirestoreStore::new(
                Arc::clone(&client),
                &config.api.firestore_url,
                &config.store.project_id,
                &config.store.database,
            );
            if let Some(auth) = &firebase_auth {
                firestore = firestore.with_auth(Arc::clone(auth));
            }
            Arc::new(firestore)
        }
        StoreBackendKind::Local => {
            let local = Arc::new(
                LocalDocumentStore::from_data_dir(&config.store.data_dir)
                    .await
                    .context("Failed to open local data directory")?,
            );
            local_store = Some(Arc::clone(&local));
            local
        }
    };

    // ── 5. Health/metrics server ────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut health_state = HealthState::new(Arc::clone(&metrics));
    if let Some(local) = local_store {
        health_state = health_state.with_local_store(local);
    }
    let health_handle = config.metrics.enabled.then(|| {
        let server = HealthServer::new(health_state.clone(), &config.metrics.bind_address);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server.run(shutdown_rx).await {
                error!(error = %e, "Health server failed");
            }
        })
    });

    // ── 6. Rate catalog ─────────────────────────────────────
    if config.store.publish_rates {
        let catalog = RateCatalog::new(
            RateTable::default(),
            Arc::clone(&store),
            &config.store.rates_collection,
        );
        match catalog.publish().await {
            Ok(n) => info!(count = n, "Rate catalog published"),
            Err(e) => warn!(error = %e, "Failed to publish rate catalog"),
        }
    }

    // ── 7. Terminal front-end ───────────────────────────────
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&identity),
        config.auth.max_attempts_per_minute,
        Arc::clone(&metrics),
    ));
    let conversions = Arc::new(ConversionService::new(
        RateTable::default(),
        identity,
        store,
        &config.store.conversions_collection,
        metrics,
    ));

    let mut app = TerminalApp::new(
        tokio::io::stdin(),
        tokio::io::stdout(),
        sessions,
        conversions,
        config.app.history_limit,
    );

    let mut interrupted = false;
    let front_end = tokio::select! {
        result = app.run() => {
            if let Err(e) = &result {
                error!(error = %e, "Terminal front-end failed");
            }
            result
        }
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
            interrupted = true;
            Ok(())
        }
    };

    // ── Graceful shutdown ───────────────────────────────────
    health_state.set_ready(false);
    let _ = shutdown_tx.send(());
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");

    if interrupted {
        // A pending stdin read would keep the runtime from exiting
        std::process::exit(130);
    }
    front_end.context("Terminal front-end failed")
}

/// Build the configured identity provider.
///
/// The Firebase provider is also returned on its own so Firestore
/// requests can carry its id token.
async fn build_identity(
    config: &AppConfig,
    client: Arc<FirebaseClient>,
) -> Result<(Arc<dyn IdentityProvider>, Option<Arc<FirebaseAuth>>)> {
    match config.auth.provider {
        AuthProviderKind::Firebase => {
            let mut auth = FirebaseAuth::from_env(client, &config.auth.api_key_env, &config.api)
                .context("Failed to load Firebase API key from env")?;
            if config.auth.persist_session {
                let file = SessionFile::new(&config.store.data_dir)
                    .await
                    .context("Failed to open session file")?;
                auth = auth.with_session_file(file);
            }

            let auth = Arc::new(auth);
            match auth.restore().await {
                Ok(Some(user)) => info!(uid = %user.uid, "Resuming previous session"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Ignoring unreadable saved session"),
            }

            let identity: Arc<dyn IdentityProvider> = auth.clone();
            Ok((identity, Some(auth)))
        }
        AuthProviderKind::Local => {
            let accounts = LocalAccounts::from_config(&config.auth.accounts)
                .context("Failed to load local accounts")?;
            info!(accounts = accounts.len(), "Using local accounts");
            Ok((Arc::new(accounts), None))
        }
    }
}
