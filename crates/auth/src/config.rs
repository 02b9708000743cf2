//! Auth client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SALEOR_API_URL` - Saleor GraphQL endpoint (e.g., `https://shop.example.com/graphql/`)
//!
//! ## Optional
//! - `SALEOR_AUTH_KEY_PREFIX` - Prefix for the storage keys (default: none)
//! - `SALEOR_AUTH_TOKEN_GRACE_SECONDS` - Treat access tokens as expired this
//!   many seconds early (default: 2)
//! - `SALEOR_HTTP_TIMEOUT_SECONDS` - Request timeout for the HTTP client (default: 30)

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::storage::StorageKeys;

/// Default grace period before an access token's `exp` claim.
pub const DEFAULT_TOKEN_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Auth client configuration.
#[derive(Debug, Clone)]
pub struct AuthClientConfig {
    /// Saleor GraphQL endpoint; every auth mutation is POSTed here
    pub api_url: Url,
    /// Optional prefix for the persisted storage keys
    pub storage_key_prefix: Option<String>,
    /// Access tokens this close to their expiry are refreshed before use
    pub token_grace_period: Duration,
    /// Timeout applied to every HTTP request, including the refresh call
    pub http_timeout: Duration,
}

impl AuthClientConfig {
    /// Configuration for `api_url` with default settings.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            storage_key_prefix: None,
            token_grace_period: DEFAULT_TOKEN_GRACE_PERIOD,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `SALEOR_API_URL` is missing or any variable
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("SALEOR_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("SALEOR_API_URL".to_string()))?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SALEOR_API_URL".to_string(), e.to_string())
        })?;

        let storage_key_prefix = lookup("SALEOR_AUTH_KEY_PREFIX").filter(|p| !p.is_empty());
        let token_grace_period = parse_seconds(
            "SALEOR_AUTH_TOKEN_GRACE_SECONDS",
            lookup("SALEOR_AUTH_TOKEN_GRACE_SECONDS"),
            DEFAULT_TOKEN_GRACE_PERIOD,
        )?;
        let http_timeout = parse_seconds(
            "SALEOR_HTTP_TIMEOUT_SECONDS",
            lookup("SALEOR_HTTP_TIMEOUT_SECONDS"),
            DEFAULT_HTTP_TIMEOUT,
        )?;

        Ok(Self {
            api_url,
            storage_key_prefix,
            token_grace_period,
            http_timeout,
        })
    }

    /// Set the storage key prefix.
    #[must_use]
    pub fn with_storage_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_key_prefix = Some(prefix.into());
        self
    }

    /// Set the access token grace period.
    #[must_use]
    pub fn with_token_grace_period(mut self, grace: Duration) -> Self {
        self.token_grace_period = grace;
        self
    }

    /// Storage keys derived from the configured prefix.
    #[must_use]
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(self.storage_key_prefix.as_deref())
    }
}

/// Parse an optional whole-seconds value.
fn parse_seconds(
    key: &str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    value.map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
