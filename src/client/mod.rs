//! Authenticated Coupa API client.
//!
//! Reads go through Coupa's GraphQL endpoint with the read-only token. Coupa
//! does not support GraphQL mutations, so writes are REST `PUT`s against
//! `/api/users/{id}` with the read-write token. Both flavors fill in a
//! [`RateLimitDescription`] on every call, including failed ones.

pub mod groups;
pub mod http;
pub mod license;
pub mod models;
pub mod path;
pub mod query;
pub mod rate_limit;
pub mod roles;
pub mod users;

pub use models::{Group, License, Role, User};
pub use rate_limit::{RateLimitDescription, RateLimitStatus, WithRateLimit};

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::auth::{Credentials, TokenManager, TokenScope};
use crate::config::{ClientOptions, CoupaConfig};
use crate::error::{CoupaError, Result};

use self::http::{bearer_headers, build_client, cancellable};
use self::models::{GraphqlEnvelope, GraphqlRequest};

#[derive(Debug)]
pub struct CoupaClient {
    base_url: Url,
    http: reqwest::Client,
    tokens: TokenManager,
}

impl CoupaClient {
    /// Create a client for an already validated base URL.
    pub fn new(
        base_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        options: &ClientOptions,
    ) -> Result<Self> {
        let http = build_client(options)?;
        let token_url = path::endpoint(&base_url, path::API_PATH_AUTH)?;
        let tokens = TokenManager::new(http.clone(), token_url, client_id, client_secret);
        Ok(Self {
            base_url,
            http,
            tokens,
        })
    }

    pub fn from_config(config: &CoupaConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.base_url()?,
            config.client_id.clone(),
            config.client_secret.clone(),
            &config.options,
        )
    }

    /// Replace the token manager (custom grace period, shared credentials).
    pub fn with_token_manager(mut self, tokens: TokenManager) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Acquire both bearer tokens if they are not cached yet.
    pub async fn ensure_initialized(&self, cancel: &CancellationToken) -> Result<Arc<Credentials>> {
        cancellable(cancel, async {
            let creds = self.tokens.ensure_initialized().await?;
            Ok::<_, CoupaError>(creds)
        })
        .await
    }

    /// Run a GraphQL read and decode its `data` payload into `T`.
    ///
    /// A non-empty `errors` array fails the call with the first message, even
    /// when `data` is also present.
    pub async fn query<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        document: &str,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<T> {
        *rate_limit = RateLimitDescription::default();
        cancellable(cancel, async {
            let creds = self.tokens.ensure_initialized().await?;
            debug!(query = document, "Querying Coupa");

            let url = path::endpoint(&self.base_url, path::API_PATH_QUERY)?;
            let request = self
                .http
                .post(url)
                .headers(bearer_headers(creds.bearer(TokenScope::ReadOnly)))
                .json(&GraphqlRequest { query: document });

            let (status, body) = self.execute(request, rate_limit).await?;
            decode_graphql(status, &body)
        })
        .await
    }

    /// `PUT` a desired state to a REST path and decode the echoed record.
    pub async fn put<B, T>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        payload: &B,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        *rate_limit = RateLimitDescription::default();
        cancellable(cancel, async {
            let creds = self.tokens.ensure_initialized().await?;
            let url = path::endpoint(&self.base_url, path)?;
            debug!(url = %url, "Writing to Coupa");

            let request = self
                .http
                .put(url)
                .headers(bearer_headers(creds.bearer(TokenScope::ReadWrite)))
                .json(payload);

            let (status, body) = self.execute(request, rate_limit).await?;
            if !status.is_success() {
                error!(status = status.as_u16(), body = %body, "Coupa rejected write");
                return Err(CoupaError::from_status(status.as_u16(), body));
            }

            serde_json::from_str(&body).map_err(|e| {
                error!(error = %e, "Failed to unmarshal response body");
                CoupaError::Decode(e)
            })
        })
        .await
    }

    /// Send a request, record its rate-limit headers, and read the body to
    /// the end so the connection is released.
    async fn execute(
        &self,
        request: RequestBuilder,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<(StatusCode, String)> {
        let response = request.send().await?;
        let status = response.status();
        *rate_limit = RateLimitDescription::from_response(status, response.headers());
        let body = response.text().await?;
        Ok((status, body))
    }
}

fn decode_graphql<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let envelope: GraphqlEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(CoupaError::from_status(status.as_u16(), body));
        }
        Err(e) => {
            error!(error = %e, "Failed to unmarshal response body");
            return Err(CoupaError::Decode(e));
        }
    };

    if let Some(first) = envelope.errors.as_ref().and_then(|errors| errors.first()) {
        error!(errors = ?envelope.errors, "Received errors from the server");
        return Err(CoupaError::RemoteQuery(first.message.clone()));
    }

    if !status.is_success() {
        return Err(CoupaError::from_status(status.as_u16(), body));
    }

    let data = envelope
        .data
        .filter(|data| !data.is_null())
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

    serde_json::from_value(data).map_err(|e| {
        error!(error = %e, "Failed to unmarshal response data");
        CoupaError::Decode(e)
    })
}

#[cfg(test)]
mod tests {
    use super::models::UsersData;
    use super::*;

    #[test]
    fn graphql_errors_win_over_data() {
        let body = r#"{"data":{"users":[{"id":1}]},"errors":[{"message":"invalid filter"},{"message":"second"}]}"#;
        let err = decode_graphql::<UsersData>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, CoupaError::RemoteQuery(ref m) if m == "invalid filter"));
    }

    #[test]
    fn null_data_decodes_as_empty() {
        let data: UsersData = decode_graphql(StatusCode::OK, r#"{"data":null}"#).unwrap();
        assert!(data.users.is_empty());
    }

    #[test]
    fn empty_errors_array_is_success() {
        let data: UsersData = decode_graphql(
            StatusCode::OK,
            r#"{"data":{"users":[{"id":3,"email":"a@b.c","fullname":"A","active":true}]},"errors":[]}"#,
        )
        .unwrap();
        assert_eq!(data.users.len(), 1);
        assert_eq!(data.users[0].id, 3);
    }

    #[test]
    fn non_json_error_status_keeps_body() {
        let err = decode_graphql::<UsersData>(StatusCode::BAD_GATEWAY, "<html>upstream</html>")
            .unwrap_err();
        match err {
            CoupaError::RemoteServer { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "<html>upstream</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_success_is_decode_error() {
        let err = decode_graphql::<UsersData>(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, CoupaError::Decode(_)));
    }
}
