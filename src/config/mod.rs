//! Configuration (layered: code > env > config file).
//!
//! The connector needs three values: the tenant domain, an OAuth client id,
//! and its secret. [`normalize_coupa_url`] turns the domain into the base URL
//! every request is built from, and rejects anything that is not a
//! `<tenant>.coupacloud.com` or `<tenant>.coupahost.com` host.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use bon::Builder;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;

use crate::error::{CoupaError, Result};

pub const ENV_DOMAIN: &str = "COUPA_DOMAIN";
pub const ENV_CLIENT_ID: &str = "COUPA_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "COUPA_CLIENT_SECRET";
pub const ENV_BASE_URL: &str = "COUPA_BASE_URL";

const COUPA_DOMAIN_OPTIONS: [&str; 2] = ["coupacloud.com", "coupahost.com"];
const DOMAIN_NOT_MATCHED: &str = "coupa domain did not match the filters. must be of the form of https://[your-company].coupacloud.com or https://[your-company].coupahost.com";

const DNS1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
pub const DNS1123_LABEL_MAX_LENGTH: usize = 63;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

static DNS1123_LABEL: OnceLock<Regex> = OnceLock::new();

fn dns1123_label_regex() -> &'static Regex {
    DNS1123_LABEL.get_or_init(|| {
        Regex::new(&format!("^{DNS1123_LABEL_FMT}$")).expect("static DNS-1123 pattern")
    })
}

/// Check that `value` is a DNS label as defined by RFC 1123.
pub fn is_dns1123_label(value: &str) -> Result<()> {
    if value.len() > DNS1123_LABEL_MAX_LENGTH {
        return Err(CoupaError::Configuration(
            "value must be less than 64 characters".to_string(),
        ));
    }
    if !dns1123_label_regex().is_match(value) {
        return Err(CoupaError::Configuration(
            "value must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character".to_string(),
        ));
    }
    Ok(())
}

/// Normalize a user-supplied Coupa domain into `https://<tenant>.<domain>`.
///
/// Accepts a bare host (`acme.coupacloud.com`) or a URL with a scheme and
/// path, which are discarded.
pub fn normalize_coupa_url(domain: &str) -> Result<String> {
    let mut host = domain.trim().to_string();
    if host.contains("//") {
        let url = Url::parse(&host)
            .map_err(|e| CoupaError::Configuration(format!("invalid coupa url: {e}")))?;
        host = url.host_str().unwrap_or_default().to_string();
    }

    let host = host.to_lowercase();
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() != 3 {
        return Err(CoupaError::Configuration(DOMAIN_NOT_MATCHED.to_string()));
    }

    let tenant = parts[0];
    if is_dns1123_label(tenant).is_err() {
        return Err(CoupaError::Configuration(DOMAIN_NOT_MATCHED.to_string()));
    }

    let coupa_domain = parts[1..].join(".");
    if !COUPA_DOMAIN_OPTIONS.contains(&coupa_domain.as_str()) {
        return Err(CoupaError::Configuration(DOMAIN_NOT_MATCHED.to_string()));
    }

    Ok(format!("https://{tenant}.{coupa_domain}"))
}

/// Transport settings for the HTTP client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("coupa-sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Connector configuration.
///
/// # Example
/// ```
/// use coupa_sync::config::CoupaConfig;
///
/// let config = CoupaConfig::builder()
///     .domain("acme.coupacloud.com")
///     .client_id("client")
///     .client_secret("secret")
///     .build();
/// assert_eq!(config.base_url().unwrap().as_str(), "https://acme.coupacloud.com/");
/// ```
#[derive(Clone, Builder, Deserialize)]
pub struct CoupaConfig {
    #[builder(into)]
    pub domain: String,
    #[builder(into)]
    pub client_id: String,
    #[builder(into)]
    pub client_secret: String,
    /// Explicit base URL; skips domain normalization (proxies, test servers).
    #[builder(into)]
    #[serde(default)]
    pub base_url: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub options: ClientOptions,
}

impl fmt::Debug for CoupaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoupaConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish()
    }
}

impl CoupaConfig {
    /// Load from environment variables (`COUPA_DOMAIN`, `COUPA_CLIENT_ID`,
    /// `COUPA_CLIENT_SECRET`, optional `COUPA_BASE_URL`), reading `.env` first
    /// if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config = Self {
            domain: required_env(ENV_DOMAIN)?,
            client_id: required_env(ENV_CLIENT_ID)?,
            client_secret: required_env(ENV_CLIENT_SECRET)?,
            base_url: std::env::var(ENV_BASE_URL).ok().filter(|v| !v.is_empty()),
            options: ClientOptions::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| CoupaError::Configuration(format!("invalid config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Default config file location (`<config dir>/coupa-sync/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "coupa-sync", "coupa-sync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check that credentials are present and the domain is acceptable.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(CoupaError::Configuration("client id is required".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(CoupaError::Configuration(
                "client secret is required".to_string(),
            ));
        }
        self.base_url().map(|_| ())
    }

    /// Resolve the base URL requests are built from.
    pub fn base_url(&self) -> Result<Url> {
        let raw = match &self.base_url {
            Some(url) => url.clone(),
            None => normalize_coupa_url(&self.domain)?,
        };
        Url::parse(&raw).map_err(|e| CoupaError::Configuration(format!("invalid base url: {e}")))
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(CoupaError::Configuration(format!(
            "environment variable {name} not set"
        ))),
    }
}
