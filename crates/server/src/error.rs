//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`; errors are captured to
//! Sentry before responding. Responses use the JSON envelope the storefront
//! front-ends expect: `{"success": false, "error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use storefront_tokens_core::TokenServiceError;

/// Application-level error type for the token service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Token lifecycle operation failed.
    #[error("token service error: {0}")]
    Token(#[from] TokenServiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Request error"
        );

        let (status, message) = match &self {
            Self::Token(TokenServiceError::Api(_)) => (
                StatusCode::BAD_GATEWAY,
                "Failed to reach the Shopify Admin API",
            ),
            Self::Token(TokenServiceError::Store(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use storefront_tokens_core::shopify::AdminApiError;
    use storefront_tokens_core::store::StoreError;

    use super::*;

    #[test]
    fn test_api_errors_map_to_bad_gateway() {
        let err = AppError::Token(TokenServiceError::Api(AdminApiError::Status {
            status: 500,
            body: "boom".to_string(),
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_store_errors_map_to_internal_error() {
        let err = AppError::Token(TokenServiceError::Store(StoreError::Backend(
            "connection refused".to_string(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
