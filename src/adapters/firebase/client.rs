//! Firebase HTTP Client - Shared REST Client
//!
//! Wraps reqwest with a concurrency limit, optional retries and
//! Google API error decoding for the Identity Toolkit, Secure Token
//! and Firestore REST APIs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::types::GoogleErrorBody;
use crate::config::ApiConfig;

/// Configuration for the Firebase HTTP client.
#[derive(Debug, Clone)]
pub struct FirebaseClientConfig {
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on 429/5xx (0 = fail on first error).
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for FirebaseClientConfig {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(30),
      max_concurrent: 4,
      max_retries: 0,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

impl From<&ApiConfig> for FirebaseClientConfig {
  fn from(api: &ApiConfig) -> Self {
    Self {
      timeout: Duration::from_secs(api.timeout_seconds),
      max_concurrent: api.max_concurrent,
      max_retries: api.max_retries,
      retry_base_delay: Duration::from_millis(api.retry_base_delay_ms),
    }
  }
}

/// HTTP client shared by the Firebase adapters.
pub struct FirebaseClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: FirebaseClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
}

impl FirebaseClient {
  /// Create a new client.
  pub fn new(config: FirebaseClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

    Ok(Self {
      http,
      config,
      semaphore,
    })
  }

  /// Send a JSON request and decode the JSON response body.
  ///
  /// `bearer` is attached as an `Authorization` header when present.
  pub async fn send_json(
    &self,
    method: Method,
    url: &str,
    body: Option<&Value>,
    bearer: Option<&str>,
  ) -> Result<Value> {
    let mut request = self.http.request(method.clone(), url);
    if let Some(body) = body {
      request = request.json(body);
    }
    if let Some(token) = bearer {
      request = request.bearer_auth(token);
    }

    let response = self.execute_with_retry(request, method.as_str(), url).await?;
    response
      .json::<Value>()
      .await
      .with_context(|| format!("Failed to decode response from {}", redact(url)))
  }

  /// Execute request with concurrency limiting and retries.
  async fn execute_with_retry(
    &self,
    request: RequestBuilder,
    method: &str,
    url: &str,
  ) -> Result<Response> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .context("Semaphore closed")?;

    let target = redact(url);
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = backoff_delay(self.config.retry_base_delay, attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }

      let req = request
        .try_clone()
        .context("Failed to clone request")?;

      match req.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(method, url = %target, "Rate limited, backing off");
            last_error = Some(anyhow::anyhow!("Rate limited by {target}"));
          }
          status if status.is_server_error() => {
            warn!(method, url = %target, status = %status, "Server error");
            let body = response.text().await.unwrap_or_default();
            last_error = Some(api_error(status, &body));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
          }
        },
        Err(e) => {
          let e = e.without_url();
          warn!(error = %e, attempt, url = %target, "Request failed");
          last_error = Some(anyhow::Error::new(e).context(format!("{method} {target} failed")));
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }
}

/// A non-success HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
  /// Response status.
  pub status: StatusCode,
  /// Google error message, or a generic description.
  pub message: String,
}

impl ApiError {
  /// Whether `err` is an `ApiError` with the given status.
  pub fn has_status(err: &anyhow::Error, status: StatusCode) -> bool {
    err
      .downcast_ref::<Self>()
      .is_some_and(|e| e.status == status)
  }
}

/// Build an error from a non-success response, preferring the
/// `error.message` field Google APIs return.
pub fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
  let message = match serde_json::from_str::<GoogleErrorBody>(body) {
    Ok(parsed) => parsed.error.message,
    Err(_) if body.trim().is_empty() => format!("API error {status}"),
    Err(_) => format!("API error {status}: {}", body.trim()),
  };
  ApiError { status, message }.into()
}

/// Delay before retry number `attempt` (1-based): the base delay
/// doubled per earlier retry, saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Strip the query string so API keys never reach the logs.
fn redact(url: &str) -> &str {
  url.split_once('?').map_or(url, |(path, _)| path)
}
