//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;
use tracing::info;

use super::{AppConfig, AuthProviderKind, StoreBackendKind};
use crate::ports::document_store::validate_collection;

/// Upper bound for `api.max_retries`.
pub const MAX_RETRIES: u32 = 10;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    auth = ?config.auth.provider,
    store = ?config.store.backend,
    metrics = config.metrics.enabled,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Provider-specific required fields
/// - Well-formed local account digests
/// - Valid collection names
/// - Positive client limits and a bounded retry count
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(!config.app.name.is_empty(), "app.name must not be empty");
  anyhow::ensure!(
    config.app.history_limit > 0,
    "app.history_limit must be positive"
  );

  // Auth validation
  anyhow::ensure!(
    config.auth.max_attempts_per_minute > 0,
    "auth.max_attempts_per_minute must be positive"
  );

  match config.auth.provider {
    AuthProviderKind::Firebase => {
      anyhow::ensure!(
        !config.auth.api_key_env.is_empty(),
        "auth.api_key_env must name an environment variable"
      );
    }
    AuthProviderKind::Local => {
      anyhow::ensure!(
        !config.auth.accounts.is_empty(),
        "At least one account must be configured for the local provider"
      );
    }
  }

  for (i, account) in config.auth.accounts.iter().enumerate() {
    anyhow::ensure!(
      account.email.contains('@'),
      "Account {} has invalid email '{}'",
      i,
      account.email
    );
    let digest = base64::engine::general_purpose::STANDARD
      .decode(&account.password_sha256)
      .with_context(|| format!("Account {} ({}) password_sha256 is not base64", i, account.email))?;
    anyhow::ensure!(
      digest.len() == 32,
      "Account {} ({}) password_sha256 must decode to 32 bytes, got {}",
      i,
      account.email,
      digest.len()
    );
  }

  // Store validation
  if config.store.backend == StoreBackendKind::Firestore {
    anyhow::ensure!(
      !config.store.project_id.is_empty(),
      "store.project_id is required for the firestore backend"
    );
  }
  validate_collection(&config.store.conversions_collection)
    .context("Invalid store.conversions_collection")?;
  validate_collection(&config.store.rates_collection)
    .context("Invalid store.rates_collection")?;

  // API validation
  anyhow::ensure!(
    config.api.timeout_seconds > 0,
    "api.timeout_seconds must be positive"
  );
  anyhow::ensure!(
    config.api.max_concurrent > 0,
    "api.max_concurrent must be positive"
  );
  anyhow::ensure!(
    config.api.max_retries <= MAX_RETRIES,
    "api.max_retries must be at most {}, got {}",
    MAX_RETRIES,
    config.api.max_retries
  );

  Ok(())
}
