//! Commerce client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COMMERCE_PUBLIC_KEY` - Public API key for the commerce backend
//!
//! ## Optional
//! - `COMMERCE_API_URL` - API base URL (default: <https://api.chec.io/v1>)
//! - `COMMERCE_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `COMMERCE_PRODUCT_LIMIT` - Products requested per catalog fetch (default: 100)
//! - `COMMERCE_CATALOG_TTL_SECS` - Catalog cache lifetime in seconds (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "https://api.chec.io/v1";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Commerce backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CommerceConfig {
    /// Base URL of the commerce REST API (no trailing slash)
    pub api_url: Url,
    /// Public API key sent as `X-Authorization`
    pub public_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
    /// Number of products requested when listing the catalog
    pub product_limit: u32,
    /// How long a fetched catalog is served from cache
    pub catalog_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("api_url", &self.api_url.as_str())
            .field("public_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("product_limit", &self.product_limit)
            .field("catalog_ttl", &self.catalog_ttl)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl CommerceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let public_key = get_validated_secret("COMMERCE_PUBLIC_KEY")?;
        let api_url = parse_api_url(&get_env_or_default("COMMERCE_API_URL", DEFAULT_API_URL))?;
        let timeout = Duration::from_secs(parse_env("COMMERCE_TIMEOUT_SECS", 30)?);
        let product_limit = parse_env("COMMERCE_PRODUCT_LIMIT", 100)?;
        let catalog_ttl = Duration::from_secs(parse_env("COMMERCE_CATALOG_TTL_SECS", 300)?);

        Ok(Self {
            api_url,
            public_key,
            timeout,
            product_limit,
            catalog_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Build a configuration for the given key with default settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not a valid base URL.
    pub fn new(api_url: &str, public_key: SecretString) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            public_key,
            timeout: Duration::from_secs(30),
            product_limit: 100,
            catalog_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Join a path (e.g. `carts/cart_123/items`) onto the API base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// The API key value for request headers.
    #[must_use]
    pub fn expose_key(&self) -> &str {
        self.public_key.expose_secret()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional numeric environment variable.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse and validate the API base URL.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("COMMERCE_API_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "COMMERCE_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "COMMERCE_API_URL".to_string(),
            "must be an absolute base URL".to_string(),
        ));
    }
    Ok(url)
}

/// Validate that a key is not a placeholder.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "is empty".to_string(),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
