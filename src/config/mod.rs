//! Configuration Module - TOML-based Application Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides via `.env` files.
//! Secrets (the Firebase API key) are never stored in the file;
//! only the name of the variable that holds them.

pub mod loader;

use serde::Deserialize;

/// Top-level application configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the first screen is shown.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Application identity and logging.
  pub app: AppSection,
  /// Identity provider selection and accounts.
  pub auth: AuthConfig,
  /// Document store selection and collection names.
  pub store: StoreConfig,
  /// Remote API endpoints and HTTP client tuning.
  #[serde(default)]
  pub api: ApiConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Application identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  /// Human-readable application name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Number of entries shown on the history screen.
  #[serde(default = "default_history_limit")]
  pub history_limit: usize,
}

/// Which identity provider backs sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
  /// Firebase Authentication REST API.
  Firebase,
  /// Accounts listed in this file.
  Local,
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  /// Provider to use.
  pub provider: AuthProviderKind,
  /// Env var holding the Firebase Web API key.
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
  /// Persist the Firebase session across restarts.
  #[serde(default = "default_true")]
  pub persist_session: bool,
  /// Sign-in attempts allowed per minute.
  #[serde(default = "default_max_attempts")]
  pub max_attempts_per_minute: u32,
  /// Local accounts (provider = "local").
  #[serde(default)]
  pub accounts: Vec<AccountConfig>,
}

/// A local account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
  /// Sign-in email.
  pub email: String,
  /// Base64 SHA-256 digest of the password.
  pub password_sha256: String,
  /// Fixed uid; derived from the email when absent.
  pub uid: Option<String>,
}

/// Which document store backs persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
  /// Cloud Firestore REST API.
  Firestore,
  /// JSON/JSONL files under `data_dir`.
  Local,
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Backend to use.
  pub backend: StoreBackendKind,
  /// Firebase project id (backend = "firestore").
  #[serde(default)]
  pub project_id: String,
  /// Firestore database id.
  #[serde(default = "default_database")]
  pub database: String,
  /// Directory for local documents and the saved session.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Collection receiving conversion records.
  #[serde(default = "default_conversions_collection")]
  pub conversions_collection: String,
  /// Collection receiving rate records.
  #[serde(default = "default_rates_collection")]
  pub rates_collection: String,
  /// Write the rate catalog to the store at startup.
  #[serde(default)]
  pub publish_rates: bool,
}

/// API endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Identity Toolkit base URL.
  #[serde(default = "default_identity_url")]
  pub identity_url: String,
  /// Secure Token base URL (id token refresh).
  #[serde(default = "default_token_url")]
  pub token_url: String,
  /// Firestore base URL.
  #[serde(default = "default_firestore_url")]
  pub firestore_url: String,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// Maximum concurrent requests.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Retries on 429/5xx, at most 10. Zero disables retrying.
  #[serde(default)]
  pub max_retries: u32,
  /// Base delay between retries (milliseconds, doubled per attempt).
  #[serde(default = "default_retry_delay")]
  pub retry_base_delay_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      identity_url: default_identity_url(),
      token_url: default_token_url(),
      firestore_url: default_firestore_url(),
      timeout_seconds: default_timeout(),
      max_concurrent: default_max_concurrent(),
      max_retries: 0,
      retry_base_delay_ms: default_retry_delay(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve /live, /ready and /metrics.
  #[serde(default)]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_history_limit() -> usize {
  20
}

fn default_api_key_env() -> String {
  "FIREBASE_API_KEY".to_string()
}

fn default_true() -> bool {
  true
}

fn default_max_attempts() -> u32 {
  5
}

fn default_database() -> String {
  "(default)".to_string()
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_conversions_collection() -> String {
  "conversions".to_string()
}

fn default_rates_collection() -> String {
  "rates".to_string()
}

fn default_identity_url() -> String {
  "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_token_url() -> String {
  "https://securetoken.googleapis.com/v1".to_string()
}

fn default_firestore_url() -> String {
  "https://firestore.googleapis.com/v1".to_string()
}

fn default_timeout() -> u64 {
  30
}

fn default_max_concurrent() -> usize {
  4
}

fn default_retry_delay() -> u64 {
  200
}

fn default_metrics_addr() -> String {
  "127.0.0.1:9090".to_string()
}
