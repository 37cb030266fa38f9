//! API client for the storefront REST backend.
//!
//! Every request built through [`ApiClient::request`] reads the token store
//! at call time and carries the current access credential as a bearer
//! header, except the refresh exchange, which authenticates with the
//! refresh credential in its body instead.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{TokenKey, TokenStore};
use crate::models::{Product, ProductDraft, ProductPatch};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Token issuance endpoint (unauthenticated)
pub const TOKEN_PATH: &str = "/api/token/";

/// Refresh-exchange endpoint; never carries a bearer header
pub const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";

/// Public product collection (active products only)
pub const PRODUCTS_PATH: &str = "/products/";

/// Admin product collection (all products, authenticated)
pub const ADMIN_PRODUCTS_PATH: &str = "/admin/products/";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Credentials returned by the issuance endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// API client for the storefront backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a new API client reading credentials from `store`
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Whether a request to `path` gets the stored access credential attached
    pub fn attaches_bearer(path: &str) -> bool {
        path != TOKEN_REFRESH_PATH
    }

    /// Build a request, attaching the access credential stored right now
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        if !Self::attaches_bearer(path) {
            return builder;
        }
        match self.store.get(TokenKey::Access) {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Send a request, turning non-success statuses into errors
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        Self::check_response(response).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send with rate-limit backoff. The request is rebuilt for every
    /// attempt so each one carries the credential stored at send time.
    async fn send_with_retry<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut builder = self.request(method.clone(), path);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match self.execute(builder).await {
                Err(ApiError::RateLimited) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(path = path, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
                other => return other,
            }
        }
    }

    async fn json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let response = self.send_with_retry(method, path, body).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.json(Method::GET, path, None::<&()>).await
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange a username/password pair for a credential pair.
    ///
    /// The issuance endpoint is unauthenticated, so this bypasses
    /// [`ApiClient::request`] and never sends a stale bearer header.
    pub async fn obtain_token_pair(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let builder = self
            .client
            .post(self.url(TOKEN_PATH))
            .json(&LoginRequest { username, password });

        let response = self.execute(builder).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("token response: {}", e)))
    }

    /// Exchange a refresh credential for a new access credential.
    /// Sent once; retrying is left to the caller.
    pub async fn exchange_refresh(&self, refresh: &str) -> Result<String, ApiError> {
        let builder = self
            .request(Method::POST, TOKEN_REFRESH_PATH)
            .json(&RefreshRequest { refresh });

        let response = self.execute(builder).await?;
        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("refresh response: {}", e)))?;
        debug!("Refresh exchange succeeded");
        Ok(body.access)
    }

    // =========================================================================
    // Public catalog
    // =========================================================================

    pub async fn fetch_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get(PRODUCTS_PATH).await
    }

    pub async fn fetch_product(&self, id: i64) -> Result<Product, ApiError> {
        self.get(&format!("{}{}/", PRODUCTS_PATH, id)).await
    }

    // =========================================================================
    // Admin products
    // =========================================================================

    pub async fn fetch_admin_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get(ADMIN_PRODUCTS_PATH).await
    }

    pub async fn fetch_admin_product(&self, id: i64) -> Result<Product, ApiError> {
        self.get(&admin_product_path(id)).await
    }

    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
        draft.validate()?;
        self.json(Method::POST, ADMIN_PRODUCTS_PATH, Some(draft)).await
    }

    pub async fn update_product(&self, id: i64, patch: &ProductPatch) -> Result<Product, ApiError> {
        patch.validate()?;
        self.json(Method::PATCH, &admin_product_path(id), Some(patch)).await
    }

    /// Soft delete: the backend marks the product inactive
    pub async fn delete_product(&self, id: i64) -> Result<(), ApiError> {
        self.send_with_retry(Method::DELETE, &admin_product_path(id), None::<&()>)
            .await?;
        Ok(())
    }
}

fn admin_product_path(id: i64) -> String {
    format!("{}{}/", ADMIN_PRODUCTS_PATH, id)
}
