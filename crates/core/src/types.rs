//! Domain types shared across the token subsystem.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// Key under which a token is cached.
///
/// Single-store deployments use [`CacheKey::Default`]; in multi-merchant
/// (OAuth) mode each shop gets its own independent key. Keys never interact.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// The single-tenant sentinel key.
    Default,
    /// Per-shop key, holding the shop domain (e.g. `my-store.myshopify.com`).
    Shop(String),
}

impl CacheKey {
    /// Key for a specific shop domain.
    #[must_use]
    pub fn for_shop(domain: &str) -> Self {
        Self::Shop(domain.to_string())
    }

    /// Reconstruct a key from its storage representation (see `Display`).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw == "default" {
            Self::Default
        } else if let Some(domain) = raw.strip_prefix("shop:") {
            Self::Shop(domain.to_string())
        } else {
            Self::Shop(raw.to_string())
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Shop(domain) => write!(f, "shop:{domain}"),
        }
    }
}

/// A live Storefront Access Token together with the remote state needed to
/// retire it later.
///
/// Records are never mutated: rotation produces a fresh record and the old
/// `token_id` is deleted remotely on a best-effort basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// The Storefront Access Token secret served to storefront clients.
    pub token: String,
    /// Remote identifier (`gid://shopify/StorefrontAccessToken/...`) needed
    /// to delete this token.
    pub token_id: String,
    /// When the token was minted; rotation age is computed from this.
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Whether this token has reached the rotation age.
    ///
    /// A record created in the future (clock skew) is never due.
    #[must_use]
    pub fn due_for_rotation(&self, rotation_period: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.created_at);
        age.to_std().is_ok_and(|age| age >= rotation_period)
    }
}

/// Result of a successful `storefrontAccessTokenCreate` mutation.
#[derive(Debug, Clone)]
pub struct MintedToken {
    /// The token secret.
    pub token: String,
    /// Remote identifier of the new token.
    pub id: String,
}

/// A Storefront Access Token as reported by the Admin API listing.
#[derive(Debug, Clone)]
pub struct RemoteToken {
    /// Remote identifier.
    pub id: String,
    /// Title the token was created with.
    pub title: String,
    /// Remote creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Admin API credentials for one shop.
///
/// Implements `Debug` manually to redact the admin token.
#[derive(Clone)]
pub struct ShopCredentials {
    /// Shop domain (e.g. `my-store.myshopify.com`).
    pub domain: String,
    /// Admin API access token for this shop.
    pub admin_token: SecretString,
}

impl ShopCredentials {
    /// Create credentials for a shop.
    #[must_use]
    pub fn new(domain: impl Into<String>, admin_token: SecretString) -> Self {
        Self {
            domain: domain.into(),
            admin_token,
        }
    }
}

impl fmt::Debug for ShopCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopCredentials")
            .field("domain", &self.domain)
            .field("admin_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_round_trip() {
        let default = CacheKey::Default;
        assert_eq!(default.to_string(), "default");
        assert_eq!(CacheKey::parse("default"), default);

        let shop = CacheKey::for_shop("my-store.myshopify.com");
        assert_eq!(shop.to_string(), "shop:my-store.myshopify.com");
        assert_eq!(CacheKey::parse("shop:my-store.myshopify.com"), shop);
    }

    #[test]
    fn test_cache_keys_are_independent_values() {
        assert_ne!(CacheKey::for_shop("a.myshopify.com"), CacheKey::Default);
        assert_ne!(
            CacheKey::for_shop("a.myshopify.com"),
            CacheKey::for_shop("b.myshopify.com")
        );
    }

    #[test]
    fn test_due_for_rotation() {
        let period = Duration::from_secs(30 * 24 * 60 * 60);

        let fresh = TokenRecord {
            token: "tok".to_string(),
            token_id: "id".to_string(),
            created_at: Utc::now(),
        };
        assert!(!fresh.due_for_rotation(period));

        let aged = TokenRecord {
            created_at: Utc::now() - chrono::Duration::days(31),
            ..fresh.clone()
        };
        assert!(aged.due_for_rotation(period));

        // Clock skew: a record from the future is not due.
        let future = TokenRecord {
            created_at: Utc::now() + chrono::Duration::days(1),
            ..fresh
        };
        assert!(!future.due_for_rotation(period));
    }

    #[test]
    fn test_shop_credentials_debug_redacts_token() {
        let creds = ShopCredentials::new(
            "my-store.myshopify.com",
            SecretString::from("shpat_super_secret"),
        );
        let debug_output = format!("{creds:?}");

        assert!(debug_output.contains("my-store.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_super_secret"));
    }
}
