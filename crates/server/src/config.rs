//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE_DOMAIN` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ADMIN_API_TOKEN` - Admin API access token used to mint tokens
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 4000)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-07)
//! - `STOREFRONT_TOKEN_CACHE_TTL_SECS` - Cache TTL in seconds (default: 30 days)
//! - `STOREFRONT_TOKEN_ROTATION_DAYS` - Token rotation age in days (default: 30)
//! - `STOREFRONT_TOKEN_TITLE_PREFIX` - Title tagging tokens this service owns
//!   (default: Storefront-Auto-Generated)
//! - `TOKENS_DATABASE_URL` - `PostgreSQL` URL for the shared token store;
//!   without it tokens are cached in process memory only
//! - `CORS_ORIGINS` - Comma-separated allowed origins (default: http://localhost:3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Default cache TTL: 30 days.
const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Default rotation age in days.
const DEFAULT_ROTATION_DAYS: u64 = 30;

/// Default title prefix marking tokens this service owns.
const DEFAULT_TITLE_PREFIX: &str = "Storefront-Auto-Generated";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins for the storefront front-ends
    pub cors_origins: Vec<String>,
    /// `PostgreSQL` URL for the shared token store (memory-only when absent)
    pub database_url: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Shopify Admin API configuration
    pub shopify: ShopifyAdminConfig,
    /// Token cache and rotation policy
    pub tokens: TokenPolicyConfig,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the admin token.
#[derive(Clone)]
pub struct ShopifyAdminConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store_domain: String,
    /// Admin API version (e.g., 2025-07)
    pub api_version: String,
    /// Admin API access token
    pub admin_api_token: SecretString,
}

impl std::fmt::Debug for ShopifyAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAdminConfig")
            .field("store_domain", &self.store_domain)
            .field("api_version", &self.api_version)
            .field("admin_api_token", &"[REDACTED]")
            .finish()
    }
}

/// Token cache and rotation policy.
///
/// The rotation period is an independent knob from the cache TTL; rotation
/// should normally trigger before TTL-based eviction does.
#[derive(Debug, Clone)]
pub struct TokenPolicyConfig {
    /// How long a cached token record lives after each write
    pub cache_ttl: Duration,
    /// Age at which a cached token is replaced
    pub rotation_period: Duration,
    /// Title prefix tagging tokens this service owns
    pub title_prefix: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = parse_env("PORT", 4000)?;

        let cors_origins = get_env_or_default("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = get_optional_env("TOKENS_DATABASE_URL").map(SecretString::from);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        let shopify = ShopifyAdminConfig::from_env()?;
        let tokens = TokenPolicyConfig::from_env()?;

        Ok(Self {
            host,
            port,
            cors_origins,
            database_url,
            sentry_dsn,
            shopify,
            tokens,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyAdminConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store_domain: get_required_env("SHOPIFY_STORE_DOMAIN")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2025-07"),
            admin_api_token: SecretString::from(get_required_env("SHOPIFY_ADMIN_API_TOKEN")?),
        })
    }
}

impl TokenPolicyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let cache_ttl_secs: u64 =
            parse_env("STOREFRONT_TOKEN_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let rotation_days: u64 =
            parse_env("STOREFRONT_TOKEN_ROTATION_DAYS", DEFAULT_ROTATION_DAYS)?;

        Ok(Self {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            rotation_period: days(rotation_days),
            title_prefix: get_env_or_default(
                "STOREFRONT_TOKEN_TITLE_PREFIX",
                DEFAULT_TITLE_PREFIX,
            ),
        })
    }
}

/// Convert whole days to a `Duration`.
const fn days(n: u64) -> Duration {
    Duration::from_secs(n * 24 * 60 * 60)
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
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
