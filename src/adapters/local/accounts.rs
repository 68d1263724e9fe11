//! Local Accounts - Config-defined Email/Password Identity
//!
//! Passwords are stored as base64 SHA-256 digests. Uids are either
//! configured or derived from the lower-cased email, so the same
//! account keeps the same uid across runs and its conversion history
//! stays attached to it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::config::AccountConfig;
use crate::ports::identity::{AuthUser, IdentityProvider};

/// Length of derived uids, matching Firebase's 28-character uids.
const UID_LEN: usize = 28;

/// A resolved local account.
#[derive(Debug, Clone)]
struct Account {
    email: String,
    digest: [u8; 32],
    uid: String,
}

/// Identity provider backed by configured accounts.
pub struct LocalAccounts {
    accounts: Vec<Account>,
    session: RwLock<Option<AuthUser>>,
}

impl LocalAccounts {
    /// Build the provider from configuration.
    ///
    /// # Errors
    /// Returns error if a digest is not base64 or not 32 bytes long.
    pub fn from_config(accounts: &[AccountConfig]) -> Result<Self> {
        let accounts = accounts
            .iter()
            .map(|a| {
                let raw = STANDARD
                    .decode(&a.password_sha256)
                    .with_context(|| format!("Invalid password digest for {}", a.email))?;
                let digest: [u8; 32] = raw.try_into().map_err(|v: Vec<u8>| {
                    anyhow::anyhow!("Digest for {} has {} bytes, expected 32", a.email, v.len())
                })?;
                Ok(Account {
                    email: a.email.trim().to_lowercase(),
                    digest,
                    uid: a.uid.clone().unwrap_or_else(|| derive_uid(&a.email)),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            accounts,
            session: RwLock::new(None),
        })
    }

    /// Number of configured accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no accounts are configured.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// SHA-256 of a password, base64-encoded, as stored in `config.toml`.
pub fn password_digest(password: &str) -> String {
    STANDARD.encode(hmac_sha256::Hash::hash(password.as_bytes()))
}

/// Stable uid for an email address.
pub fn derive_uid(email: &str) -> String {
    let digest = hmac_sha256::Hash::hash(email.trim().to_lowercase().as_bytes());
    let mut uid = URL_SAFE_NO_PAD.encode(digest);
    uid.truncate(UID_LEN);
    uid
}

/// Compare digests without short-circuiting on the first difference.
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[async_trait]
impl IdentityProvider for LocalAccounts {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let email = email.trim().to_lowercase();
        let digest = hmac_sha256::Hash::hash(password.as_bytes());

        let account = self
            .accounts
            .iter()
            .find(|a| a.email == email && digests_match(&a.digest, &digest));

        let Some(account) = account else {
            warn!("Rejected local sign-in");
            anyhow::bail!("Invalid email or password");
        };

        let user = AuthUser {
            uid: account.uid.clone(),
            email: Some(account.email.clone()),
        };
        *self.session.write().await = Some(user.clone());

        info!(uid = %user.uid, "Signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(user) = self.session.write().await.take() {
            info!(uid = %user.uid, "Signed out");
        }
        Ok(())
    }

    async fn current_user(&self) -> Option<AuthUser> {
        self.session.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> LocalAccounts {
        LocalAccounts::from_config(&[
            AccountConfig {
                email: "Demo@Example.com".to_string(),
                password_sha256: password_digest("demo1234"),
                uid: None,
            },
            AccountConfig {
                email: "fixed@example.com".to_string(),
                password_sha256: password_digest("pw"),
                uid: Some("fixed-uid".to_string()),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_password_digest_matches_sample_config() {
        assert_eq!(
            password_digest("demo1234"),
            "Dq0gYLZZktykdpr2AaGzo17zjPrSwsRluxYOp2QVfF0="
        );
    }

    #[test]
    fn test_derived_uid_is_stable_and_case_insensitive() {
        let a = derive_uid("demo@example.com");
        assert_eq!(a.len(), UID_LEN);
        assert_eq!(a, derive_uid(" DEMO@example.com "));
        assert_ne!(a, derive_uid("other@example.com"));
    }

    #[test]
    fn test_rejects_malformed_digest() {
        let result = LocalAccounts::from_config(&[AccountConfig {
            email: "a@b.c".to_string(),
            password_sha256: "c2hvcnQ=".to_string(),
            uid: None,
        }]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let provider = provider();
        assert_eq!(provider.len(), 2);

        let user = provider.sign_in("demo@example.com", "demo1234").await.unwrap();
        assert_eq!(user.uid, derive_uid("demo@example.com"));
        assert_eq!(provider.current_user().await, Some(user));

        provider.sign_out().await.unwrap();
        assert!(provider.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_keeps_previous_session() {
        let provider = provider();
        provider.sign_in("fixed@example.com", "pw").await.unwrap();

        let err = provider.sign_in("demo@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(
            provider.current_user().await.map(|u| u.uid),
            Some("fixed-uid".to_string())
        );
    }
}
