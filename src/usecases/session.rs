//! Session Manager - Sign-in, Sign-out and Throttling
//!
//! Validates login input, throttles attempts with a governor rate
//! limiter, and turns provider failures into displayable errors.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::navigation::{Route, start_route};
use crate::adapters::metrics::MetricsRegistry;
use crate::ports::identity::{AuthUser, IdentityProvider};

/// Why a login or logout failed. Messages are shown as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
  #[error("Email must not be blank")]
  BlankEmail,
  #[error("Password must not be blank")]
  BlankPassword,
  #[error("Too many sign-in attempts, try again later")]
  TooManyAttempts,
  #[error("{0}")]
  Provider(String),
}

/// Coordinates the identity provider for the front-end.
pub struct SessionManager {
  /// Identity port.
  identity: Arc<dyn IdentityProvider>,
  /// Sign-in attempt limiter.
  limiter: DefaultDirectRateLimiter,
  /// Sign-in outcome counters.
  metrics: Arc<MetricsRegistry>,
}

impl SessionManager {
  /// Create a session manager allowing `max_attempts_per_minute` sign-ins.
  pub fn new(
    identity: Arc<dyn IdentityProvider>,
    max_attempts_per_minute: u32,
    metrics: Arc<MetricsRegistry>,
  ) -> Self {
    let per_minute = NonZeroU32::new(max_attempts_per_minute).unwrap_or(NonZeroU32::MIN);
    Self {
      identity,
      limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
      metrics,
    }
  }

  /// Sign in with email and password.
  #[instrument(skip(self, password))]
  pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, SessionError> {
    let email = email.trim();
    if email.is_empty() {
      self.metrics.record_sign_in("invalid");
      return Err(SessionError::BlankEmail);
    }
    if password.trim().is_empty() {
      self.metrics.record_sign_in("invalid");
      return Err(SessionError::BlankPassword);
    }

    if self.limiter.check().is_err() {
      warn!("Sign-in throttled");
      self.metrics.record_sign_in("throttled");
      return Err(SessionError::TooManyAttempts);
    }

    match self.identity.sign_in(email, password).await {
      Ok(user) => {
        self.metrics.record_sign_in("success");
        info!(uid = %user.uid, "Login succeeded");
        Ok(user)
      }
      Err(e) => {
        self.metrics.record_sign_in("failure");
        warn!(error = %e, "Login failed");
        Err(SessionError::Provider(e.to_string()))
      }
    }
  }

  /// Sign out of the current session.
  #[instrument(skip(self))]
  pub async fn logout(&self) -> Result<(), SessionError> {
    self
      .identity
      .sign_out()
      .await
      .map_err(|e| SessionError::Provider(e.to_string()))
  }

  /// The signed-in user, if any.
  pub async fn current_user(&self) -> Option<AuthUser> {
    self.identity.current_user().await
  }

  /// Start destination for the current session state.
  pub async fn start_route(&self) -> Route {
    start_route(self.current_user().await.is_some())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::local::LocalAccounts;
  use crate::adapters::local::accounts::password_digest;
  use crate::config::AccountConfig;

  fn manager(max_attempts: u32) -> SessionManager {
    let accounts = LocalAccounts::from_config(&[AccountConfig {
      email: "demo@example.com".to_string(),
      password_sha256: password_digest("demo1234"),
      uid: Some("demo".to_string()),
    }])
    .unwrap();
    SessionManager::new(
      Arc::new(accounts),
      max_attempts,
      Arc::new(MetricsRegistry::new().unwrap()),
    )
  }

  #[tokio::test]
  async fn test_blank_fields_rejected_before_provider() {
    let sessions = manager(5);
    assert_eq!(sessions.login("  ", "x").await, Err(SessionError::BlankEmail));
    assert_eq!(
      sessions.login("demo@example.com", "").await,
      Err(SessionError::BlankPassword)
    );
  }

  #[tokio::test]
  async fn test_login_logout_round() {
    let sessions = manager(5);
    assert_eq!(sessions.start_route().await, Route::Login);

    let user = sessions.login(" demo@example.com ", "demo1234").await.unwrap();
    assert_eq!(user.uid, "demo");
    assert_eq!(sessions.start_route().await, Route::Home);

    sessions.logout().await.unwrap();
    assert!(sessions.current_user().await.is_none());
  }

  #[tokio::test]
  async fn test_provider_error_is_displayable() {
    let sessions = manager(5);
    let err = sessions.login("demo@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid email or password");
  }

  #[tokio::test]
  async fn test_attempts_are_throttled() {
    let sessions = manager(2);
    assert!(sessions.login("demo@example.com", "wrong").await.is_err());
    assert!(sessions.login("demo@example.com", "wrong").await.is_err());
    assert_eq!(
      sessions.login("demo@example.com", "demo1234").await,
      Err(SessionError::TooManyAttempts)
    );
  }
}
