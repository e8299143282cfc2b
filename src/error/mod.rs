//! Error types for coupa-sync.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for all coupa-sync operations.
#[derive(Error, Debug)]
pub enum CoupaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote query error: {0}")]
    RemoteQuery(String),

    #[error("Coupa internal server error (status {status}): {body}")]
    RemoteServer { status: u16, body: String },

    #[error("Coupa bad request (status {status}): {body}")]
    RemoteRequest { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(
        "Reconciliation error: {relation} for user {user_id} expected {expected} entries, server returned {actual}"
    )]
    Reconciliation {
        relation: &'static str,
        user_id: i64,
        expected: usize,
        actual: usize,
    },

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Multiple users found for id {user_id} ({count})")]
    AmbiguousResult { user_id: i64, count: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoupaError {
    /// Classify a non-success HTTP status on a write path.
    ///
    /// The body is kept verbatim so callers can log what Coupa said.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status >= 500 {
            Self::RemoteServer { status, body }
        } else {
            Self::RemoteRequest { status, body }
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Transport(e) if e.is_timeout() => ErrorCategory::Timeout,
            Self::Transport(_) => ErrorCategory::Network,
            Self::RemoteQuery(_) => ErrorCategory::Api,
            Self::RemoteServer { .. } => ErrorCategory::Server,
            Self::RemoteRequest { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                _ => ErrorCategory::Api,
            },
            Self::Decode(_) => ErrorCategory::Serialization,
            Self::Reconciliation { .. } => ErrorCategory::Reconciliation,
            Self::NotFound(_) | Self::AmbiguousResult { .. } => ErrorCategory::Lookup,
            Self::Configuration(_) | Self::InvalidArgument(_) => ErrorCategory::Configuration,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Io(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether an external driver may reasonably retry this item later.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Reconciliation => RecoverySuggestion::ResyncResource,
            ErrorCategory::Lookup => RecoverySuggestion::ResyncResource,
            ErrorCategory::Cancelled => RecoverySuggestion::None,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CoupaError>;
