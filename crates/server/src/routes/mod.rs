//! HTTP route handlers for the token service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//!
//! # Storefront Access Tokens
//! GET  /api/storefront-token          - Current token (mint/rotate as needed)
//! POST /api/storefront-token/rotate   - Force rotation
//! POST /api/storefront-token/cleanup  - Delete stale remote tokens
//! ```

pub mod tokens;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create all routes for the token service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/storefront-token", get(tokens::current))
        .route("/api/storefront-token/rotate", post(tokens::rotate))
        .route("/api/storefront-token/cleanup", post(tokens::cleanup))
}
