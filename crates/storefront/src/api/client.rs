//! HTTP client for the backend REST API.
//!
//! Uses `reqwest` with a per-request timeout. Roles, categories and products
//! are cached using `moka` for the configured TTL.

use std::sync::Arc;

use bazaar_core::ProductId;
use bazaar_core::account::{Address, Card, Role};
use bazaar_core::catalog::{Category, Product, ProductPage, ProductQuery};
use bazaar_core::validation::{NewAddress, NewCard};
use moka::future::Cache;
use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use super::types::{AuthenticatedUser, LoginRequest, OrderCreated, OrderRequest, SignupRequest};
use crate::config::ApiConfig;

/// Client for the backend REST API.
///
/// Cheap to clone; clones share the connection pool and the cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Parse(format!("Invalid path {path}: {e}")))
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.inner.client.get(self.url(path)?))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.inner.client.post(self.url(path)?))
    }

    /// Send a request and return the body of a successful response.
    async fn send(
        &self,
        request: RequestBuilder,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<String, ApiError> {
        let request = match token {
            Some(token) => request.header(AUTHORIZATION, token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_status(status, path, &body, token.is_some());
            if err.is_server_error() {
                tracing::error!(
                    status = %status,
                    path,
                    body = %body.chars().take(500).collect::<String>(),
                    "Backend returned non-success status"
                );
            } else {
                debug!(status = %status, path, "Backend rejected request");
            }
            return Err(err);
        }

        Ok(body)
    }

    /// Send a request and decode the JSON response.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        let body = self.send(request, path, token).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    // =========================================================================
    // Catalog (cached)
    // =========================================================================

    /// List the user roles offered at registration.
    #[instrument(skip(self))]
    pub async fn roles(&self) -> Result<Vec<Role>, ApiError> {
        if let Some(CacheValue::Roles(roles)) = self.inner.cache.get(&CacheKey::Roles).await {
            debug!("Cache hit for roles");
            return Ok(roles);
        }

        let roles: Vec<Role> = self.send_json(self.get("/roles")?, "/roles", None).await?;

        self.inner
            .cache
            .insert(CacheKey::Roles, CacheValue::Roles(roles.clone()))
            .await;

        Ok(roles)
    }

    /// List every category, for the navigation menu and shop filters.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self
            .send_json(self.get("/categories")?, "/categories", None)
            .await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// List one page of products.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let cache_key = CacheKey::Products(query.clone());

        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.url("/products")?;
        let pairs = query.to_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        let request = self.inner.client.get(url);
        let page: ProductPage = self.send_json(request, "/products", None).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the product does not exist.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{id}");
        let product: Product = self.send_json(self.get(&path)?, &path, None).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for a token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, ApiError> {
        let request = self.post("/login")?.json(&LoginRequest { email, password });
        self.send_json(request, "/login", None).await
    }

    /// Create an account. The backend emails an activation link.
    #[instrument(skip_all, fields(email = signup.email, role_id = %signup.role_id))]
    pub async fn signup(&self, signup: &SignupRequest<'_>) -> Result<(), ApiError> {
        let request = self.post("/signup")?.json(signup);
        self.send(request, "/signup", None).await.map(drop)
    }

    /// Check a stored token and return fresh user data.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &SecretString) -> Result<AuthenticatedUser, ApiError> {
        self.send_json(self.get("/verify")?, "/verify", Some(token))
            .await
    }

    // =========================================================================
    // Account (never cached)
    // =========================================================================

    /// Saved addresses of the token's owner.
    #[instrument(skip_all)]
    pub async fn addresses(&self, token: &SecretString) -> Result<Vec<Address>, ApiError> {
        self.send_json(self.get("/user/address")?, "/user/address", Some(token))
            .await
    }

    /// Save a new address.
    #[instrument(skip_all, fields(title = %address.title))]
    pub async fn add_address(
        &self,
        token: &SecretString,
        address: &NewAddress,
    ) -> Result<(), ApiError> {
        let request = self.post("/user/address")?.json(address);
        self.send(request, "/user/address", Some(token))
            .await
            .map(drop)
    }

    /// Saved cards of the token's owner.
    #[instrument(skip_all)]
    pub async fn cards(&self, token: &SecretString) -> Result<Vec<Card>, ApiError> {
        self.send_json(self.get("/user/card")?, "/user/card", Some(token))
            .await
    }

    /// Save a new card.
    #[instrument(skip_all)]
    pub async fn add_card(&self, token: &SecretString, card: &NewCard) -> Result<(), ApiError> {
        let request = self.post("/user/card")?.json(card);
        self.send(request, "/user/card", Some(token)).await.map(drop)
    }

    /// Place an order.
    #[instrument(skip_all, fields(address_id = %order.address_id, lines = order.products.len()))]
    pub async fn create_order(
        &self,
        token: &SecretString,
        order: &OrderRequest,
    ) -> Result<OrderCreated, ApiError> {
        let request = self.post("/order")?.json(order);
        let body = self.send(request, "/order", Some(token)).await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::Json;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use serde_json::{Value, json};

    use super::*;

    async fn serve(router: axum::Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(&ApiConfig {
            base_url: Url::parse(&format!("http://{addr}/api/")).unwrap(),
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_categories_are_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = axum::Router::new()
            .route(
                "/api/categories",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!([
                        {"id": 1, "code": "k:tisort", "title": "Tişört", "gender": "k", "img": "", "rating": 4.2}
                    ]))
                }),
            )
            .with_state(hits.clone());
        let client = serve(router).await;

        let first = client.categories().await.unwrap();
        let second = client.categories().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].title, "Tişört");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_authorized_requests_send_token() {
        let router = axum::Router::new().route(
            "/api/user/card",
            get(|headers: HeaderMap| async move {
                if headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("tok-1") {
                    Ok(Json(json!([])))
                } else {
                    Err(StatusCode::UNAUTHORIZED)
                }
            }),
        );
        let client = serve(router).await;

        let cards = client.cards(&SecretString::from("tok-1")).await.unwrap();
        assert!(cards.is_empty());

        let err = client.cards(&SecretString::from("expired")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_backend_message_is_surfaced() {
        let router = axum::Router::new().route(
            "/api/login",
            axum::routing::post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"message": "Invalid credentials"})),
                )
            }),
        );
        let client = serve(router).await;

        let err = client.login("ada@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.user_message("Login failed"), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let router = axum::Router::new().route(
            "/api/products/{id}",
            get(|| async { (StatusCode::NOT_FOUND, Json(Value::Null)) }),
        );
        let client = serve(router).await;

        let err = client.product(ProductId::new(42)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(path) if path == "/products/42"));
    }
}
