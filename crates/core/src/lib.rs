//! Storefront Access Token lifecycle library.
//!
//! The public storefront client authenticates against Shopify's Storefront
//! API with a Storefront Access Token. This crate owns that credential's
//! lifecycle: tokens are minted on demand through the Admin API, cached with
//! an absolute expiry, rotated once they reach a configurable age, and stale
//! remote tokens are reclaimed by a best-effort cleanup pass.
//!
//! # Architecture
//!
//! - [`cache`] - generic keyed store with lazy, absolute-time expiry
//! - [`store`] - [`store::TokenStore`] abstraction over the cache, with an
//!   in-memory implementation and an optional `PostgreSQL`-backed one
//!   (`postgres` feature) for multi-instance deployments
//! - [`shopify`] - the Admin API gateway: contract plus `reqwest`-based client
//! - [`service`] - [`StorefrontTokenService`], the per-tenant decision logic
//!   (reuse, rotate, or mint)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use storefront_tokens_core::service::StorefrontTokenService;
//! use storefront_tokens_core::shopify::AdminClient;
//! use storefront_tokens_core::store::MemoryTokenStore;
//! use storefront_tokens_core::types::ShopCredentials;
//!
//! let store = MemoryTokenStore::new(Duration::from_secs(30 * 24 * 60 * 60));
//! let gateway = AdminClient::new("2025-07")?;
//! let shop = ShopCredentials::new("my-store.myshopify.com", admin_token);
//!
//! let tokens = StorefrontTokenService::new(
//!     store,
//!     gateway,
//!     shop,
//!     Duration::from_secs(30 * 24 * 60 * 60),
//!     "Storefront-Auto-Generated",
//! );
//!
//! let token = tokens.get_token().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod service;
pub mod shopify;
pub mod store;
pub mod types;

pub use service::{StorefrontTokenService, TokenServiceError};
pub use types::{CacheKey, MintedToken, RemoteToken, ShopCredentials, TokenRecord};
