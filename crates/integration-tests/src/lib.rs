//! Integration tests for the storefront token service.
//!
//! The tests in `tests/` drive the full token lifecycle (mint, cache hit,
//! rotation, manual rotation, cleanup) against the library with a scripted
//! Admin API gateway, so no Shopify credentials or network access are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefront-tokens-integration-tests
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use storefront_tokens_core::shopify::{AdminApiError, AdminTokenApi};
use storefront_tokens_core::types::{MintedToken, RemoteToken, ShopCredentials};

/// Scripted Admin API gateway.
///
/// Mints tokens from a fixed script, records every create/delete call, and
/// serves a configurable remote token listing. Clones share state, so tests
/// keep a handle after moving the gateway into the service.
#[derive(Clone)]
pub struct ScriptedGateway {
    state: Arc<GatewayState>,
}

struct GatewayState {
    mints: Mutex<VecDeque<MintedToken>>,
    created_titles: Mutex<Vec<String>>,
    deleted_ids: Mutex<Vec<String>>,
    delete_succeeds: AtomicBool,
    remote: Mutex<Vec<RemoteToken>>,
}

impl ScriptedGateway {
    /// Gateway that will mint the given `(token, id)` pairs in order.
    #[must_use]
    pub fn new(mints: &[(&str, &str)]) -> Self {
        let mints = mints
            .iter()
            .map(|(token, id)| MintedToken {
                token: (*token).to_string(),
                id: (*id).to_string(),
            })
            .collect();

        Self {
            state: Arc::new(GatewayState {
                mints: Mutex::new(mints),
                created_titles: Mutex::new(Vec::new()),
                deleted_ids: Mutex::new(Vec::new()),
                delete_succeeds: AtomicBool::new(true),
                remote: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Make every subsequent delete call fail (return `false`).
    pub fn fail_deletes(&self) {
        self.state.delete_succeeds.store(false, Ordering::SeqCst);
    }

    /// Script the remote token listing.
    pub fn set_remote(&self, tokens: Vec<RemoteToken>) {
        *lock(&self.state.remote) = tokens;
    }

    /// Titles passed to `create_token`, in call order.
    #[must_use]
    pub fn created_titles(&self) -> Vec<String> {
        lock(&self.state.created_titles).clone()
    }

    /// Ids passed to `delete_token`, in call order.
    #[must_use]
    pub fn deleted_ids(&self) -> Vec<String> {
        lock(&self.state.deleted_ids).clone()
    }
}

impl AdminTokenApi for ScriptedGateway {
    async fn create_token(
        &self,
        _shop: &ShopCredentials,
        title: &str,
    ) -> Result<MintedToken, AdminApiError> {
        lock(&self.state.created_titles).push(title.to_string());
        lock(&self.state.mints)
            .pop_front()
            .ok_or(AdminApiError::Status {
                status: 500,
                body: "mint script exhausted".to_string(),
            })
    }

    async fn list_tokens(
        &self,
        _shop: &ShopCredentials,
    ) -> Result<Vec<RemoteToken>, AdminApiError> {
        Ok(lock(&self.state.remote).clone())
    }

    async fn delete_token(&self, _shop: &ShopCredentials, id: &str) -> bool {
        lock(&self.state.deleted_ids).push(id.to_string());
        self.state.delete_succeeds.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
