//! Application state shared across handlers.

use std::sync::Arc;

use storefront_tokens_core::service::StorefrontTokenService;
use storefront_tokens_core::shopify::AdminClient;
use storefront_tokens_core::store::AnyTokenStore;

use crate::config::ServerConfig;

/// The concrete token service this binary runs: store picked at startup,
/// real Admin API client.
pub type TokenService = StorefrontTokenService<AnyTokenStore, AdminClient>;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    tokens: TokenService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, tokens: TokenService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, tokens }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the token lifecycle service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }
}
