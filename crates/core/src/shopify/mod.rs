//! Shopify Admin API gateway.
//!
//! The token subsystem needs exactly three Admin API operations:
//! `storefrontAccessTokenCreate`, the `shop.storefrontAccessTokens` listing,
//! and `storefrontAccessTokenDelete`. [`AdminTokenApi`] is the contract the
//! lifecycle service programs against; [`AdminClient`] is the `reqwest`-based
//! implementation.
//!
//! # Failure asymmetry
//!
//! Creation and listing fail loudly with [`AdminApiError`] - a caller that
//! cannot mint a token has nothing to serve. Deletion returns a plain `bool`:
//! a failed delete must never fail rotation or cleanup, so it is an expected
//! outcome rather than an error (the orphaned remote token is reclaimed by a
//! later cleanup pass).

mod admin;

pub use admin::AdminClient;

use thiserror::Error;

use crate::types::{MintedToken, RemoteToken, ShopCredentials};

/// Errors from the Admin API.
#[derive(Debug, Error)]
pub enum AdminApiError {
    /// HTTP request failed (transport error or timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Admin API returned a non-success status.
    #[error("Admin API returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Rate limited by Shopify.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Top-level GraphQL errors in the response.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// Non-empty `userErrors` list in a mutation payload.
    #[error("user errors: {0}")]
    UserError(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response had neither the expected payload nor errors.
    #[error("Admin API response missing {0}")]
    MissingData(&'static str),
}

/// A GraphQL error returned by the Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response, if provided.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .map(|e| {
            if e.path.is_empty() {
                e.message.clone()
            } else {
                let path = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                format!("{} (path: {path})", e.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Contract for the three Admin API operations the lifecycle service uses.
///
/// Credentials are passed per call because in multi-merchant mode each shop
/// carries its own Admin token. Tests substitute a scripted implementation.
#[allow(async_fn_in_trait)]
pub trait AdminTokenApi: Send + Sync {
    /// Create a Storefront Access Token titled `title`.
    ///
    /// Any user error in the mutation payload aborts creation - there is no
    /// partial success.
    async fn create_token(
        &self,
        shop: &ShopCredentials,
        title: &str,
    ) -> Result<MintedToken, AdminApiError>;

    /// List the shop's Storefront Access Tokens (first 50).
    async fn list_tokens(&self, shop: &ShopCredentials)
    -> Result<Vec<RemoteToken>, AdminApiError>;

    /// Delete a Storefront Access Token by remote id.
    ///
    /// Returns `false` on any failure (transport, GraphQL, or user error);
    /// callers treat deletion as advisory.
    async fn delete_token(&self, shop: &ShopCredentials, id: &str) -> bool;
}
