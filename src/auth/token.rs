use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const READ_ONLY_SCOPES: [&str; 7] = [
    "core.business_entity.read",
    "core.common.read",
    "core.user_group.read",
    "core.user.read",
    "email login",
    "openid",
    "profile",
];

const WRITE_SCOPES: [&str; 2] = ["core.user_group.write", "core.user.write"];

/// Privilege level a bearer token is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum TokenScope {
    /// Used for every GraphQL read.
    ReadOnly,
    /// Used for REST writes against `/api/users`.
    ReadWrite,
}

impl TokenScope {
    /// OAuth scope strings sent to the token endpoint.
    pub fn scopes(self) -> Vec<&'static str> {
        match self {
            Self::ReadOnly => READ_ONLY_SCOPES.to_vec(),
            Self::ReadWrite => READ_ONLY_SCOPES
                .iter()
                .chain(WRITE_SCOPES.iter())
                .copied()
                .collect(),
        }
    }

    /// Space-joined `scope` form parameter.
    pub fn scope_param(self) -> String {
        self.scopes().join(" ")
    }
}

/// OAuth access token returned by the client-credentials grant.
#[derive(Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Token {
    /// True if the token expires within `grace`. Tokens without an expiry
    /// never expire.
    pub fn is_expired(&self, grace: Duration) -> bool {
        self.expires_at
            .map(|expires_at| Utc::now() + grace >= expires_at)
            .unwrap_or(false)
    }
}

/// The pair of tokens a client holds after initialization.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub read_only: Token,
    pub read_write: Token,
    pub acquired_at: DateTime<Utc>,
}

impl Credentials {
    pub fn token(&self, scope: TokenScope) -> &Token {
        match scope {
            TokenScope::ReadOnly => &self.read_only,
            TokenScope::ReadWrite => &self.read_write,
        }
    }

    pub fn bearer(&self, scope: TokenScope) -> &str {
        &self.token(scope).access_token
    }

    /// True if either token has to be re-acquired.
    pub fn needs_refresh(&self, grace: Duration) -> bool {
        self.read_only.is_expired(grace) || self.read_write.is_expired(grace)
    }
}
