//! Storefront Access Token route handlers.
//!
//! Thin wrappers over the lifecycle service; response envelopes match what
//! the storefront front-ends consume.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// Response for the current-token endpoint.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

/// Response for the rotate endpoint.
#[derive(Debug, Serialize)]
pub struct RotateResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}

/// Response for the cleanup endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: usize,
}

/// Return the current Storefront Access Token, minting a new one if none
/// exists or if rotation is due.
#[instrument(skip(state))]
pub async fn current(State(state): State<AppState>) -> Result<Json<TokenResponse>> {
    tracing::info!("storefront token requested");

    let token = state.tokens().get_token().await?;

    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}

/// Manually rotate the token: evict the cached record, then mint fresh.
#[instrument(skip(state))]
pub async fn rotate(State(state): State<AppState>) -> Result<Json<RotateResponse>> {
    tracing::info!("manual token rotation requested");

    state.tokens().clear_cache(None).await?;
    let token = state.tokens().get_token().await?;

    Ok(Json(RotateResponse {
        success: true,
        message: "Token rotated successfully".to_string(),
        token,
    }))
}

/// Delete stale remote tokens this service created.
#[instrument(skip(state))]
pub async fn cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    tracing::info!("token cleanup requested");

    let deleted_count = state.tokens().cleanup_stale_tokens().await?;

    Ok(Json(CleanupResponse {
        success: true,
        message: format!("Cleaned up {deleted_count} old token(s)"),
        deleted_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_shape() {
        let response = TokenResponse {
            success: true,
            token: "tok1".to_string(),
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({ "success": true, "token": "tok1" })
        );
    }

    #[test]
    fn test_cleanup_response_uses_camel_case() {
        let response = CleanupResponse {
            success: true,
            message: "Cleaned up 2 old token(s)".to_string(),
            deleted_count: 2,
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["deletedCount"], 2);
        assert!(value.get("deleted_count").is_none());
    }
}
