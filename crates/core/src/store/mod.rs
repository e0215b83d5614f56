//! Token record storage.
//!
//! The lifecycle service reads and writes [`TokenRecord`]s through the
//! [`TokenStore`] trait rather than owning a cache directly, so that
//! single-instance deployments can use a plain in-memory map while
//! multi-instance deployments share a persistent store (otherwise each
//! instance would silently mint its own token, and one instance's cleanup
//! could delete another's live token).
//!
//! All implementations keep the lazy-expiry contract of
//! [`crate::cache::ExpiringCache`]: a record past its TTL is removed on read
//! and reported as absent.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::ExpiringCache;
use crate::types::{CacheKey, TokenRecord};

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresTokenStore;

/// Errors from a token store backend.
///
/// The in-memory store never fails; persistent backends surface their I/O
/// errors here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage operation failed.
    #[error("storage error: {0}")]
    Backend(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Keyed store of token records with absolute-time expiry.
#[allow(async_fn_in_trait)]
pub trait TokenStore: Send + Sync {
    /// Return the record for `key` if present and not expired; expired
    /// records are evicted.
    async fn get(&self, key: &CacheKey) -> Result<Option<TokenRecord>, StoreError>;

    /// Store `record` under `key`, overwriting any existing record and
    /// restarting its TTL.
    async fn set(&self, key: CacheKey, record: TokenRecord) -> Result<(), StoreError>;

    /// Remove one key's record, or every record when `key` is `None`.
    async fn clear(&self, key: Option<&CacheKey>) -> Result<(), StoreError>;

    /// All keys currently holding a record, expired or not.
    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError>;
}

/// In-memory token store for tests and single-instance deployments.
///
/// Cheaply cloneable; clones share the same underlying cache.
#[derive(Clone)]
pub struct MemoryTokenStore {
    cache: Arc<ExpiringCache<CacheKey, TokenRecord>>,
}

impl MemoryTokenStore {
    /// Create a store whose records live for `ttl` after each write.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(ExpiringCache::new(ttl)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.cache.get(key))
    }

    async fn set(&self, key: CacheKey, record: TokenRecord) -> Result<(), StoreError> {
        self.cache.set(key, record);
        Ok(())
    }

    async fn clear(&self, key: Option<&CacheKey>) -> Result<(), StoreError> {
        self.cache.clear(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        Ok(self.cache.keys())
    }
}

/// Runtime-selected token store, so binaries can pick a backend from
/// configuration without threading generics through their state.
#[derive(Clone)]
pub enum AnyTokenStore {
    /// In-memory map (single instance).
    Memory(MemoryTokenStore),
    /// Shared `PostgreSQL` store (multi instance).
    #[cfg(feature = "postgres")]
    Postgres(PostgresTokenStore),
}

impl TokenStore for AnyTokenStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<TokenRecord>, StoreError> {
        match self {
            Self::Memory(store) => store.get(key).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: CacheKey, record: TokenRecord) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.set(key, record).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(store) => store.set(key, record).await,
        }
    }

    async fn clear(&self, key: Option<&CacheKey>) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.clear(key).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(store) => store.clear(key).await,
        }
    }

    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        match self {
            Self::Memory(store) => store.keys().await,
            #[cfg(feature = "postgres")]
            Self::Postgres(store) => store.keys().await,
        }
    }
}
