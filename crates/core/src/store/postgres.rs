//! `PostgreSQL`-backed token store for multi-instance deployments.
//!
//! Schema lives in the server crate's `migrations/` directory:
//!
//! ```sql
//! CREATE TABLE storefront_token (
//!     cache_key  TEXT PRIMARY KEY,
//!     token      TEXT NOT NULL,
//!     token_id   TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! Expiry mirrors the in-memory cache: rows past `expires_at` are deleted on
//! read rather than by a background job.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::{StoreError, TokenStore};
use crate::types::{CacheKey, TokenRecord};

/// Shared token store on `PostgreSQL`.
///
/// Cheaply cloneable; clones share the same connection pool.
#[derive(Clone)]
pub struct PostgresTokenStore {
    pool: PgPool,
    ttl: Duration,
}

impl PostgresTokenStore {
    /// Create a store whose rows live for `ttl` after each write.
    #[must_use]
    pub const fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// The underlying connection pool (for health checks).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TokenStore for PostgresTokenStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<TokenRecord>, StoreError> {
        // Lazy eviction: drop the row if it has expired, then read.
        sqlx::query("DELETE FROM storefront_token WHERE cache_key = $1 AND expires_at <= NOW()")
            .bind(key.to_string())
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            "SELECT token, token_id, created_at FROM storefront_token WHERE cache_key = $1",
        )
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| TokenRecord {
            token: row.get("token"),
            token_id: row.get("token_id"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        }))
    }

    async fn set(&self, key: CacheKey, record: TokenRecord) -> Result<(), StoreError> {
        let expires_at = Utc::now() + self.ttl;

        sqlx::query(
            r"
            INSERT INTO storefront_token (cache_key, token, token_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (cache_key) DO UPDATE SET
                token = EXCLUDED.token,
                token_id = EXCLUDED.token_id,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            ",
        )
        .bind(key.to_string())
        .bind(&record.token)
        .bind(&record.token_id)
        .bind(record.created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, key: Option<&CacheKey>) -> Result<(), StoreError> {
        match key {
            Some(key) => {
                sqlx::query("DELETE FROM storefront_token WHERE cache_key = $1")
                    .bind(key.to_string())
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                sqlx::query("DELETE FROM storefront_token")
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        let rows = sqlx::query("SELECT cache_key FROM storefront_token")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| CacheKey::parse(row.get("cache_key")))
            .collect())
    }
}
