//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Reconciliation,
    Lookup,
    Cancelled,
    Unknown,
}

/// Suggested recovery action for the sync driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    /// Re-read the resource from Coupa before trying again.
    ResyncResource,
    ContactSupport,
    None,
}

impl RecoverySuggestion {
    /// Short operator-facing hint, if there is one worth printing.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::RetryWithBackoff => Some("retry later; Coupa may be throttling or unavailable"),
            Self::CheckCredentials => Some("check the OAuth client id, secret and scopes"),
            Self::CheckConfiguration => Some("check the tenant domain and arguments"),
            Self::ResyncResource => Some("re-read the user from Coupa before retrying"),
            Self::ContactSupport | Self::None => None,
        }
    }
}
