//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `OPTIKA_API_URL` - Catalog API base URL (default: `http://127.0.0.1:8000/api`)
//! - `OPTIKA_API_TOKEN` - Bearer token sent to the catalog API
//! - `OPTIKA_HTTP_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `OPTIKA_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `OPTIKA_CACHE_CAPACITY` - Catalog cache entries (default: 1000)
//! - `OPTIKA_STORAGE_DIR` - Directory for the cart/favorites slots (default: `.optika`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_STORAGE_DIR: &str = ".optika";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront runtime configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Catalog API configuration
    pub catalog: CatalogConfig,
    /// Directory holding the persisted cart and favorites slots
    pub storage_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Catalog API client configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Base URL; always ends with `/` so relative paths join below it
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long product responses stay cached
    pub cache_ttl: Duration,
    /// Maximum cached responses
    pub cache_capacity: u64,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

impl CatalogConfig {
    /// Configuration pointing at `base_url` with default timeouts and cache.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("OPTIKA_API_URL", base_url)?,
            token: None,
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 1000,
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(
                "OPTIKA_API_URL",
                &get_env_or_default("OPTIKA_API_URL", DEFAULT_API_URL),
            )?,
            token: get_optional_env("OPTIKA_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(get_parsed_env("OPTIKA_HTTP_TIMEOUT_SECS", 30)?),
            cache_ttl: Duration::from_secs(get_parsed_env("OPTIKA_CACHE_TTL_SECS", 300)?),
            cache_capacity: get_parsed_env("OPTIKA_CACHE_CAPACITY", 1000)?,
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            catalog: CatalogConfig::from_env()?,
            storage_dir: PathBuf::from(get_env_or_default(
                "OPTIKA_STORAGE_DIR",
                DEFAULT_STORAGE_DIR,
            )),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a base URL and make sure it ends with a slash.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }

    let url = Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}
