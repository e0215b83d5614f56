//! `reqwest`-based Admin API client.
//!
//! Sends the three token operations as raw GraphQL documents over
//! `POST {domain}/admin/api/{version}/graphql.json` with the
//! `X-Shopify-Access-Token` header, and deserializes responses through a
//! typed envelope. The Admin schema is not vendored here, so the documents
//! are hand-written rather than generated.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;

use super::{AdminApiError, AdminTokenApi, GraphQLError};
use crate::types::{MintedToken, RemoteToken, ShopCredentials};

/// Timeout applied to every Admin API call, so a hung request stalls only
/// its own caller.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CREATE_TOKEN_MUTATION: &str = r"
mutation CreateStorefrontAccessToken($input: StorefrontAccessTokenInput!) {
    storefrontAccessTokenCreate(input: $input) {
        storefrontAccessToken {
            id
            accessToken
            title
        }
        userErrors {
            field
            message
        }
    }
}";

const LIST_TOKENS_QUERY: &str = r"
query ListStorefrontAccessTokens {
    shop {
        storefrontAccessTokens(first: 50) {
            edges {
                node {
                    id
                    title
                    createdAt
                }
            }
        }
    }
}";

const DELETE_TOKEN_MUTATION: &str = r"
mutation DeleteStorefrontAccessToken($input: StorefrontAccessTokenDeleteInput!) {
    storefrontAccessTokenDelete(input: $input) {
        deletedStorefrontAccessTokenId
        userErrors {
            field
            message
        }
    }
}";

/// Shopify Admin API client for Storefront Access Token operations.
///
/// Credentials are supplied per call (see [`AdminTokenApi`]); the client
/// itself only holds the HTTP connection pool and the API version.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    api_version: String,
    /// Test-only endpoint override (the mock server speaks plain HTTP).
    #[cfg(test)]
    base_url: Option<String>,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct UserErrorNode {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenData {
    storefront_access_token_create: Option<CreateTokenPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenPayload {
    storefront_access_token: Option<StorefrontAccessTokenNode>,
    #[serde(default)]
    user_errors: Vec<UserErrorNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorefrontAccessTokenNode {
    id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListTokensData {
    shop: ShopNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShopNode {
    storefront_access_tokens: TokenConnection,
}

#[derive(Debug, Deserialize)]
struct TokenConnection {
    edges: Vec<TokenEdge>,
}

#[derive(Debug, Deserialize)]
struct TokenEdge {
    node: RemoteTokenNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTokenNode {
    id: String,
    title: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteTokenData {
    storefront_access_token_delete: Option<DeleteTokenPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteTokenPayload {
    deleted_storefront_access_token_id: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserErrorNode>,
}

impl AdminClient {
    /// Create a new Admin API client for the given API version
    /// (e.g. `2025-07`).
    ///
    /// # Errors
    ///
    /// Returns `AdminApiError::Http` if the HTTP client fails to build.
    pub fn new(api_version: &str) -> Result<Self, AdminApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(AdminClientInner {
                client,
                api_version: api_version.to_string(),
                #[cfg(test)]
                base_url: None,
            }),
        })
    }

    #[cfg(test)]
    fn with_base_url(api_version: &str, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            inner: Arc::new(AdminClientInner {
                client,
                api_version: api_version.to_string(),
                base_url: Some(base_url.to_string()),
            }),
        }
    }

    fn endpoint(&self, shop: &ShopCredentials) -> String {
        #[cfg(test)]
        if let Some(base) = &self.inner.base_url {
            return format!(
                "{base}/admin/api/{}/graphql.json",
                self.inner.api_version
            );
        }

        format!(
            "https://{}/admin/api/{}/graphql.json",
            shop.domain, self.inner.api_version
        )
    }

    /// Execute one GraphQL operation against the shop's Admin API.
    async fn execute<T: DeserializeOwned>(
        &self,
        shop: &ShopCredentials,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AdminApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(shop))
            .header("X-Shopify-Access-Token", shop.admin_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(AdminApiError::RateLimited(retry_after));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                shop = %shop.domain,
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Admin API returned non-success status"
            );
            return Err(AdminApiError::Status {
                status: status.as_u16(),
                body: response_text.chars().take(200).collect(),
            });
        }

        let response: GraphQLResponse<T> = serde_json::from_str(&response_text)?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, "GraphQL errors in Admin API response");
            return Err(AdminApiError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        path: e.path,
                    })
                    .collect(),
            ));
        }

        response.data.ok_or(AdminApiError::MissingData("data"))
    }

    async fn try_delete_token(
        &self,
        shop: &ShopCredentials,
        id: &str,
    ) -> Result<bool, AdminApiError> {
        let variables = serde_json::json!({ "input": { "id": id } });
        let data: DeleteTokenData = self
            .execute(shop, DELETE_TOKEN_MUTATION, variables)
            .await?;

        let payload = data
            .storefront_access_token_delete
            .ok_or(AdminApiError::MissingData("storefrontAccessTokenDelete"))?;

        if !payload.user_errors.is_empty() {
            let messages = join_messages(payload.user_errors);
            tracing::error!(
                shop = %shop.domain,
                token_id = %id,
                errors = %messages,
                "user errors deleting storefront access token"
            );
            return Ok(false);
        }

        Ok(payload.deleted_storefront_access_token_id.is_some())
    }
}

impl AdminTokenApi for AdminClient {
    #[instrument(skip(self, shop), fields(shop = %shop.domain, title = %title))]
    async fn create_token(
        &self,
        shop: &ShopCredentials,
        title: &str,
    ) -> Result<MintedToken, AdminApiError> {
        let variables = serde_json::json!({ "input": { "title": title } });
        let data: CreateTokenData = self
            .execute(shop, CREATE_TOKEN_MUTATION, variables)
            .await?;

        let payload = data
            .storefront_access_token_create
            .ok_or(AdminApiError::MissingData("storefrontAccessTokenCreate"))?;

        if !payload.user_errors.is_empty() {
            return Err(AdminApiError::UserError(join_messages(payload.user_errors)));
        }

        let node = payload
            .storefront_access_token
            .ok_or(AdminApiError::MissingData("storefrontAccessToken"))?;

        Ok(MintedToken {
            token: node.access_token,
            id: node.id,
        })
    }

    #[instrument(skip(self, shop), fields(shop = %shop.domain))]
    async fn list_tokens(
        &self,
        shop: &ShopCredentials,
    ) -> Result<Vec<RemoteToken>, AdminApiError> {
        let data: ListTokensData = self
            .execute(shop, LIST_TOKENS_QUERY, serde_json::Value::Null)
            .await?;

        Ok(data
            .shop
            .storefront_access_tokens
            .edges
            .into_iter()
            .map(|edge| RemoteToken {
                id: edge.node.id,
                title: edge.node.title,
                created_at: edge.node.created_at,
            })
            .collect())
    }

    #[instrument(skip(self, shop), fields(shop = %shop.domain, token_id = %id))]
    async fn delete_token(&self, shop: &ShopCredentials, id: &str) -> bool {
        match self.try_delete_token(shop, id).await {
            Ok(deleted) => deleted,
            Err(error) => {
                tracing::error!(
                    shop = %shop.domain,
                    token_id = %id,
                    error = %error,
                    "failed to delete storefront access token"
                );
                false
            }
        }
    }
}

fn join_messages(errors: Vec<UserErrorNode>) -> String {
    errors
        .into_iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;

    const API_VERSION: &str = "2025-07";

    fn shop() -> ShopCredentials {
        ShopCredentials::new("test-shop.myshopify.com", SecretString::from("shpat_test"))
    }

    fn graphql_path() -> String {
        format!("/admin/api/{API_VERSION}/graphql.json")
    }

    #[tokio::test]
    async fn test_create_token_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(graphql_path())
                    .header("X-Shopify-Access-Token", "shpat_test")
                    .body_includes("storefrontAccessTokenCreate");
                then.status(200).json_body(json!({
                    "data": {
                        "storefrontAccessTokenCreate": {
                            "storefrontAccessToken": {
                                "id": "gid://shopify/StorefrontAccessToken/1",
                                "accessToken": "tok1",
                                "title": "Storefront-Auto-Generated"
                            },
                            "userErrors": []
                        }
                    }
                }));
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        let minted = client
            .create_token(&shop(), "Storefront-Auto-Generated")
            .await
            .expect("create should succeed");

        assert_eq!(minted.token, "tok1");
        assert_eq!(minted.id, "gid://shopify/StorefrontAccessToken/1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_token_user_errors_abort_creation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(graphql_path());
                then.status(200).json_body(json!({
                    "data": {
                        "storefrontAccessTokenCreate": {
                            "storefrontAccessToken": null,
                            "userErrors": [
                                { "field": ["input", "title"], "message": "Title is invalid" }
                            ]
                        }
                    }
                }));
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        let err = client
            .create_token(&shop(), "bad title")
            .await
            .expect_err("user errors must fail creation");

        assert!(matches!(err, AdminApiError::UserError(ref msg) if msg.contains("Title is invalid")));
    }

    #[tokio::test]
    async fn test_create_token_graphql_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(graphql_path());
                then.status(200).json_body(json!({
                    "data": null,
                    "errors": [{ "message": "Access denied" }]
                }));
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        let err = client
            .create_token(&shop(), "Storefront-Auto-Generated")
            .await
            .expect_err("GraphQL errors must fail creation");

        assert!(matches!(err, AdminApiError::GraphQL(_)));
    }

    #[tokio::test]
    async fn test_create_token_non_success_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(graphql_path());
                then.status(502).body("bad gateway");
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        let err = client
            .create_token(&shop(), "Storefront-Auto-Generated")
            .await
            .expect_err("non-2xx must fail creation");

        assert!(matches!(err, AdminApiError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_create_token_rate_limited() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(graphql_path());
                then.status(429).header("Retry-After", "7");
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        let err = client
            .create_token(&shop(), "Storefront-Auto-Generated")
            .await
            .expect_err("429 must fail creation");

        assert!(matches!(err, AdminApiError::RateLimited(7)));
    }

    #[tokio::test]
    async fn test_list_tokens_parses_nodes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(graphql_path())
                    .body_includes("storefrontAccessTokens");
                then.status(200).json_body(json!({
                    "data": {
                        "shop": {
                            "storefrontAccessTokens": {
                                "edges": [
                                    { "node": {
                                        "id": "gid://shopify/StorefrontAccessToken/1",
                                        "title": "Storefront-Auto-Generated",
                                        "createdAt": "2025-06-01T00:00:00Z"
                                    }},
                                    { "node": {
                                        "id": "gid://shopify/StorefrontAccessToken/2",
                                        "title": "Manual token",
                                        "createdAt": "2025-07-15T12:30:00Z"
                                    }}
                                ]
                            }
                        }
                    }
                }));
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        let tokens = client.list_tokens(&shop()).await.expect("list");

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].id, "gid://shopify/StorefrontAccessToken/1");
        assert_eq!(tokens[0].title, "Storefront-Auto-Generated");
        assert_eq!(tokens[1].created_at.to_rfc3339(), "2025-07-15T12:30:00+00:00");
    }

    #[tokio::test]
    async fn test_list_tokens_empty_shop() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(graphql_path());
                then.status(200).json_body(json!({
                    "data": {
                        "shop": { "storefrontAccessTokens": { "edges": [] } }
                    }
                }));
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        let tokens = client.list_tokens(&shop()).await.expect("list");
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn test_delete_token_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(graphql_path())
                    .body_includes("storefrontAccessTokenDelete");
                then.status(200).json_body(json!({
                    "data": {
                        "storefrontAccessTokenDelete": {
                            "deletedStorefrontAccessTokenId": "gid://shopify/StorefrontAccessToken/1",
                            "userErrors": []
                        }
                    }
                }));
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        assert!(
            client
                .delete_token(&shop(), "gid://shopify/StorefrontAccessToken/1")
                .await
        );
    }

    #[tokio::test]
    async fn test_delete_token_user_errors_return_false() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(graphql_path());
                then.status(200).json_body(json!({
                    "data": {
                        "storefrontAccessTokenDelete": {
                            "deletedStorefrontAccessTokenId": null,
                            "userErrors": [
                                { "field": ["id"], "message": "Token does not exist" }
                            ]
                        }
                    }
                }));
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        assert!(
            !client
                .delete_token(&shop(), "gid://shopify/StorefrontAccessToken/404")
                .await
        );
    }

    #[tokio::test]
    async fn test_delete_token_graphql_errors_return_false() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(graphql_path());
                then.status(200).json_body(json!({
                    "data": null,
                    "errors": [{ "message": "Access denied" }]
                }));
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        assert!(!client.delete_token(&shop(), "gid://x/1").await);
    }

    #[tokio::test]
    async fn test_delete_token_transport_failure_returns_false() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(graphql_path());
                then.status(500).body("boom");
            })
            .await;

        let client = AdminClient::with_base_url(API_VERSION, &server.base_url());
        assert!(!client.delete_token(&shop(), "gid://x/1").await);
    }
}
