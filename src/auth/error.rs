use thiserror::Error;

/// Errors raised while acquiring OAuth tokens from Coupa.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Client id and client secret are required")]
    MissingCredentials,
    #[error("Token endpoint returned status {status}: {body}")]
    TokenEndpoint { status: u16, body: String },
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}
