//! Storefront Access Token lifecycle service.
//!
//! Decides, per tenant, whether to serve the cached token, rotate it, or
//! mint a fresh one, and runs the best-effort cleanup of orphaned remote
//! tokens. The service is an explicitly constructed, dependency-injected
//! value - it owns its store and gateway and has no global state.
//!
//! # Failure semantics
//!
//! Minting failures propagate: a caller that cannot get a token must see the
//! error. Deleting the superseded token during rotation, and each individual
//! deletion during cleanup, are best-effort - failures are logged with the
//! shop and token id and swallowed, since the newly minted token is already
//! valid and an orphaned remote token is reclaimed by a later cleanup pass.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::shopify::{AdminApiError, AdminTokenApi};
use crate::store::{StoreError, TokenStore};
use crate::types::{CacheKey, ShopCredentials, TokenRecord};

/// Errors surfaced by the lifecycle service.
#[derive(Debug, Error)]
pub enum TokenServiceError {
    /// The Admin API call on the mint path failed.
    #[error("Admin API error: {0}")]
    Api(#[from] AdminApiError),

    /// The token store failed.
    #[error("token store error: {0}")]
    Store(#[from] StoreError),
}

/// Per-tenant Storefront Access Token orchestration.
///
/// Generic over the [`TokenStore`] (in-memory or persistent) and the
/// [`AdminTokenApi`] gateway so tests can script the remote side.
pub struct StorefrontTokenService<S, G> {
    store: S,
    gateway: G,
    /// Default-tenant credentials, also used for cleanup.
    shop: ShopCredentials,
    /// Age after which a cached token is replaced; independent of the
    /// store's TTL (rotation should normally fire before TTL eviction).
    rotation_period: Duration,
    /// Naming convention marking tokens this service owns.
    title_prefix: String,
    /// Per-key locks held across the check-then-act sequence in
    /// `get_or_mint`, so concurrent callers cannot both decide to mint.
    mint_locks: StdMutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl<S, G> StorefrontTokenService<S, G>
where
    S: TokenStore,
    G: AdminTokenApi,
{
    /// Create a new token service.
    ///
    /// `shop` holds the default tenant's Admin credentials;
    /// `rotation_period` is the age at which cached tokens are replaced;
    /// `title_prefix` tags every token this service creates.
    pub fn new(
        store: S,
        gateway: G,
        shop: ShopCredentials,
        rotation_period: Duration,
        title_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            shop,
            rotation_period,
            title_prefix: title_prefix.into(),
            mint_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Get the current Storefront Access Token for the default tenant,
    /// minting or rotating as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a token must be minted and the Admin API call
    /// fails, or if the store fails. Failure to delete a superseded token
    /// is never an error.
    pub async fn get_token(&self) -> Result<String, TokenServiceError> {
        self.get_or_mint(CacheKey::Default, &self.shop, &self.title_prefix)
            .await
    }

    /// Get the current Storefront Access Token for a specific shop
    /// (multi-merchant mode). The caller supplies the shop's own Admin
    /// credentials, typically from its OAuth session.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_token`].
    pub async fn get_token_for_shop(
        &self,
        shop: &ShopCredentials,
    ) -> Result<String, TokenServiceError> {
        let title = format!("{}-{}", self.title_prefix, shop.domain);
        self.get_or_mint(CacheKey::for_shop(&shop.domain), shop, &title)
            .await
    }

    /// Evict one shop's cached token, or every cached token, so the next
    /// `get_token` call mints fresh. Used for manual rotation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn clear_cache(&self, shop: Option<&str>) -> Result<(), TokenServiceError> {
        match shop {
            Some(domain) => {
                self.store
                    .clear(Some(&CacheKey::for_shop(domain)))
                    .await?;
                tracing::info!(shop = %domain, "cleared cached storefront token");
            }
            None => {
                self.store.clear(None).await?;
                tracing::info!("cleared storefront token cache");
            }
        }
        Ok(())
    }

    /// Delete remote tokens that this service created (title prefix match),
    /// are older than the rotation period, and do not back any currently
    /// cached record. Returns the number of confirmed deletions.
    ///
    /// Individual deletion failures are logged and skipped; only listing
    /// failures abort the pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote listing or the store fails.
    #[instrument(skip(self))]
    pub async fn cleanup_stale_tokens(&self) -> Result<usize, TokenServiceError> {
        let remote = self.gateway.list_tokens(&self.shop).await?;
        let protected = self.protected_token_ids().await?;
        let cutoff = Utc::now() - self.rotation_period;

        let mut deleted = 0;
        for token in remote {
            if !token.title.starts_with(&self.title_prefix) {
                continue;
            }
            if protected.contains(&token.id) {
                continue;
            }
            if token.created_at >= cutoff {
                continue;
            }

            if self.gateway.delete_token(&self.shop, &token.id).await {
                deleted += 1;
                tracing::info!(
                    token_id = %token.id,
                    created_at = %token.created_at,
                    "deleted stale storefront access token"
                );
            } else {
                tracing::warn!(
                    token_id = %token.id,
                    "could not delete stale storefront access token"
                );
            }
        }

        tracing::info!(deleted, "storefront token cleanup finished");
        Ok(deleted)
    }

    /// Token ids backing live records, across every tenant in the store.
    ///
    /// With a shared persistent store this protects the live tokens of every
    /// instance, not just this process's.
    async fn protected_token_ids(&self) -> Result<HashSet<String>, TokenServiceError> {
        let mut ids = HashSet::new();
        for key in self.store.keys().await? {
            // `get` evicts expired records, so only live tokens are protected.
            if let Some(record) = self.store.get(&key).await? {
                ids.insert(record.token_id);
            }
        }
        Ok(ids)
    }

    async fn get_or_mint(
        &self,
        key: CacheKey,
        shop: &ShopCredentials,
        title: &str,
    ) -> Result<String, TokenServiceError> {
        let lock = self.mint_lock(&key);
        let _guard = lock.lock().await;

        if let Some(record) = self.store.get(&key).await? {
            if record.due_for_rotation(self.rotation_period) {
                tracing::info!(
                    key = %key,
                    token_id = %record.token_id,
                    "storefront token due for rotation, minting replacement"
                );
                return self.mint(key, shop, title, Some(record.token_id)).await;
            }

            tracing::debug!(key = %key, "returning cached storefront token");
            return Ok(record.token);
        }

        tracing::info!(key = %key, "no cached storefront token, minting");
        self.mint(key, shop, title, None).await
    }

    /// Mint a token, cache it, and best-effort delete the superseded one.
    async fn mint(
        &self,
        key: CacheKey,
        shop: &ShopCredentials,
        title: &str,
        superseded: Option<String>,
    ) -> Result<String, TokenServiceError> {
        let minted = self.gateway.create_token(shop, title).await?;
        tracing::info!(
            shop = %shop.domain,
            token_id = %minted.id,
            "created storefront access token"
        );

        let record = TokenRecord {
            token: minted.token.clone(),
            token_id: minted.id,
            created_at: Utc::now(),
        };
        self.store.set(key, record).await?;

        if let Some(old_id) = superseded {
            if self.gateway.delete_token(shop, &old_id).await {
                tracing::info!(
                    shop = %shop.domain,
                    token_id = %old_id,
                    "deleted superseded storefront access token"
                );
            } else {
                tracing::warn!(
                    shop = %shop.domain,
                    token_id = %old_id,
                    "could not delete superseded storefront access token"
                );
            }
        }

        Ok(minted.token)
    }

    fn mint_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self
            .mint_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.clone()).or_default().clone()
    }
}
