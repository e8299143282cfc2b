//! HTTP client construction and shared request helpers.

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;

use crate::config::ClientOptions;
use crate::error::{CoupaError, Result};

/// Build the reqwest client used for both token and API requests.
pub fn build_client(options: &ClientOptions) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(options.timeout())
        .user_agent(options.user_agent.clone())
        .pool_max_idle_per_host(10)
        .build()?)
}

/// Headers for a JSON request authorized with a bearer token.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Run `fut` until it finishes or `cancel` fires, whichever comes first.
///
/// Dropping the future aborts any in-flight request.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CoupaError::Cancelled),
        result = fut => result,
    }
}
