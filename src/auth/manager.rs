//! Lazy client-credentials token acquisition.

use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::AuthError;
use super::token::{Credentials, Token, TokenScope};

/// Default margin before expiry at which credentials are re-acquired.
pub const DEFAULT_REFRESH_GRACE_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Fetches and caches the read-only and read-write bearer tokens.
///
/// Both tokens are acquired together on the first call to
/// [`TokenManager::ensure_initialized`]; either both are stored or neither is.
/// Later calls hand out the cached pair until one of the tokens comes within
/// the grace period of its reported expiry.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    grace_period: Duration,
    credentials: RwLock<Option<Arc<Credentials>>>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grace_period: Duration::seconds(DEFAULT_REFRESH_GRACE_SECS),
            credentials: RwLock::new(None),
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Whether a usable credential pair is cached.
    pub async fn is_initialized(&self) -> bool {
        self.credentials
            .read()
            .await
            .as_ref()
            .is_some_and(|creds| !creds.needs_refresh(self.grace_period))
    }

    /// Return cached credentials, acquiring them first if necessary.
    pub async fn ensure_initialized(&self) -> Result<Arc<Credentials>, AuthError> {
        if let Some(creds) = self.cached().await {
            debug!("Coupa client already initialized");
            return Ok(creds);
        }

        let mut slot = self.credentials.write().await;
        // Another caller may have initialized while we waited for the lock.
        if let Some(creds) = slot.as_ref() {
            if !creds.needs_refresh(self.grace_period) {
                return Ok(creds.clone());
            }
            debug!("Coupa credentials expiring, re-acquiring tokens");
        } else {
            debug!("Initializing Coupa client");
        }

        let read_only = self.fetch(TokenScope::ReadOnly).await?;
        let read_write = self.fetch(TokenScope::ReadWrite).await?;

        let creds = Arc::new(Credentials {
            read_only,
            read_write,
            acquired_at: Utc::now(),
        });
        *slot = Some(creds.clone());
        Ok(creds)
    }

    async fn cached(&self) -> Option<Arc<Credentials>> {
        let guard = self.credentials.read().await;
        guard
            .as_ref()
            .filter(|creds| !creds.needs_refresh(self.grace_period))
            .cloned()
    }

    async fn fetch(&self, scope: TokenScope) -> Result<Token, AuthError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        debug!(scope = %scope, url = %self.token_url, "Requesting Coupa access token");

        let scope_param = scope.scope_param();
        let resp = self
            .http
            .post(self.token_url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", scope_param.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let payload: TokenResponse = serde_json::from_str(&body)?;
        if payload.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "token response has an empty access_token".to_string(),
            ));
        }

        Ok(Token {
            access_token: payload.access_token,
            token_type: payload.token_type,
            expires_at: payload
                .expires_in
                .filter(|secs| *secs > 0)
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime)),
        })
    }
}
