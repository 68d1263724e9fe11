//! Identity Provider Port - Authentication Interface
//!
//! Email/password sign-in delegated to an external provider. The
//! provider owns the session; callers only ask who is signed in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The signed-in user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
  /// Provider-assigned user id.
  pub uid: String,
  /// Email the user signed in with, if the provider returns it.
  pub email: Option<String>,
}

/// Trait for identity providers.
///
/// Implementors hold at most one session at a time. A successful
/// `sign_in` replaces any previous session.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
  /// Sign in with email and password.
  ///
  /// # Errors
  /// Returns error if the credentials are rejected or the provider
  /// is unreachable. The message is suitable for display.
  async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<AuthUser>;

  /// End the current session. Signing out without a session is a no-op.
  async fn sign_out(&self) -> anyhow::Result<()>;

  /// The user of the current session, if any.
  async fn current_user(&self) -> Option<AuthUser>;
}
