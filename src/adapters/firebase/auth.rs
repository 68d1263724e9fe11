//! Firebase Authentication - Email/Password Sign-in over REST
//!
//! Implements the `IdentityProvider` port against the Identity Toolkit
//! API. The API key comes from an environment variable (default
//! `FIREBASE_API_KEY`). The session lives in memory and, when a
//! `SessionFile` is attached, on disk so it survives restarts.
//! Expired id tokens are refreshed through the Secure Token API.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::client::FirebaseClient;
use super::types::{
    RefreshRequest, RefreshResponse, SignInRequest, SignInResponse, describe_auth_error,
};
use crate::adapters::persistence::SessionFile;
use crate::config::ApiConfig;
use crate::ports::identity::{AuthUser, IdentityProvider};

/// Refresh this long before the id token actually expires.
const REFRESH_MARGIN_MS: i64 = 60_000;

/// Persisted Firebase session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseSession {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Id token expiry (Unix ms).
    pub expires_at_ms: i64,
}

impl FirebaseSession {
    fn user(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }

    fn needs_refresh(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms - REFRESH_MARGIN_MS
    }
}

/// Firebase Authentication adapter.
pub struct FirebaseAuth {
    /// Shared HTTP client.
    client: Arc<FirebaseClient>,
    /// Web API key (never logged).
    api_key: String,
    /// Identity Toolkit base URL.
    identity_url: String,
    /// Secure Token base URL.
    token_url: String,
    /// Current session.
    session: RwLock<Option<FirebaseSession>>,
    /// Optional on-disk copy of the session.
    session_file: Option<SessionFile>,
}

impl FirebaseAuth {
    /// Create an adapter with an explicit API key.
    pub fn new(client: Arc<FirebaseClient>, api_key: String, api: &ApiConfig) -> Self {
        Self {
            client,
            api_key,
            identity_url: api.identity_url.trim_end_matches('/').to_string(),
            token_url: api.token_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            session_file: None,
        }
    }

    /// Create an adapter reading the API key from `var`.
    ///
    /// The variable SHOULD be set in `.env` (never committed to git).
    pub fn from_env(client: Arc<FirebaseClient>, var: &str, api: &ApiConfig) -> Result<Self> {
        let api_key = std::env::var(var).with_context(|| format!("{var} not set"))?;
        Ok(Self::new(client, api_key, api))
    }

    /// Persist sessions to `file`.
    #[must_use]
    pub fn with_session_file(mut self, file: SessionFile) -> Self {
        self.session_file = Some(file);
        self
    }

    /// Load a previously saved session, if any.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<Option<AuthUser>> {
        let Some(file) = &self.session_file else {
            return Ok(None);
        };

        let Some(saved) = file.load::<FirebaseSession>().await? else {
            return Ok(None);
        };

        let user = saved.user();
        info!(uid = %user.uid, "Restored saved session");
        *self.session.write().await = Some(saved);
        Ok(Some(user))
    }

    /// A valid id token for the current session, refreshing if needed.
    ///
    /// Returns `None` when nobody is signed in.
    pub async fn id_token(&self) -> Result<Option<String>> {
        let current = self.session.read().await.clone();
        let Some(session) = current else {
            return Ok(None);
        };

        if !session.needs_refresh(Utc::now().timestamp_millis()) {
            return Ok(Some(session.id_token));
        }

        debug!(uid = %session.uid, "Id token expired, refreshing");
        let refreshed = self.refresh(&session).await?;
        let token = refreshed.id_token.clone();
        self.persist(Some(&refreshed)).await;
        *self.session.write().await = Some(refreshed);
        Ok(Some(token))
    }

    /// Exchange the refresh token for a new id token.
    async fn refresh(&self, session: &FirebaseSession) -> Result<FirebaseSession> {
        let url = format!("{}/token?key={}", self.token_url, self.api_key);
        let body = serde_json::to_value(RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: &session.refresh_token,
        })?;

        let response = self
            .client
            .send_json(Method::POST, &url, Some(&body), None)
            .await
            .map_err(|e| anyhow::anyhow!(describe_auth_error(&e.to_string())))?;
        let refreshed: RefreshResponse =
            serde_json::from_value(response).context("Malformed token refresh response")?;

        Ok(FirebaseSession {
            uid: refreshed.user_id,
            email: session.email.clone(),
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            expires_at_ms: expiry_from_now(&refreshed.expires_in),
        })
    }

    /// Mirror the session to disk. Failures are logged, not returned.
    async fn persist(&self, session: Option<&FirebaseSession>) {
        let Some(file) = &self.session_file else {
            return;
        };

        let result = match session {
            Some(s) => file.save(s).await,
            None => file.clear().await,
        };

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }
}

/// Absolute expiry for an `expiresIn` value in seconds.
fn expiry_from_now(expires_in: &str) -> i64 {
    let secs = expires_in.trim().parse::<i64>().unwrap_or(3600);
    Utc::now().timestamp_millis() + secs * 1000
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let url = format!(
            "{}/accounts:signInWithPassword?key={}",
            self.identity_url, self.api_key
        );
        let body = serde_json::to_value(SignInRequest {
            email,
            password,
            return_secure_token: true,
        })?;

        let response = self
            .client
            .send_json(Method::POST, &url, Some(&body), None)
            .await
            .map_err(|e| anyhow::anyhow!(describe_auth_error(&e.to_string())))?;
        let signed_in: SignInResponse =
            serde_json::from_value(response).context("Malformed sign-in response")?;

        let session = FirebaseSession {
            uid: signed_in.local_id,
            email: signed_in.email.or_else(|| Some(email.to_string())),
            id_token: signed_in.id_token,
            refresh_token: signed_in.refresh_token,
            expires_at_ms: expiry_from_now(&signed_in.expires_in),
        };
        let user = session.user();

        self.persist(Some(&session)).await;
        *self.session.write().await = Some(session);

        info!(uid = %user.uid, "Signed in");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<()> {
        let previous = self.session.write().await.take();
        self.persist(None).await;
        if let Some(s) = previous {
            info!(uid = %s.uid, "Signed out");
        }
        Ok(())
    }

    async fn current_user(&self) -> Option<AuthUser> {
        self.session.read().await.as_ref().map(FirebaseSession::user)
    }
}
