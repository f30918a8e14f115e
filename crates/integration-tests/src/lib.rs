//! Integration test harness for the Bazaar storefront.
//!
//! [`TestContext::start`] binds two servers on ephemeral ports: an axum mock
//! of the Bazaar REST API and the real storefront router pointed at it. Tests
//! talk to the storefront through a cookie-keeping [`reqwest::Client`] that
//! does not follow redirects, so every post/redirect/get hop can be asserted.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::state::AppState;
use serde_json::{Value, json};

/// Password the mock backend accepts for every known user.
pub const PASSWORD: &str = "Secret1!";

/// Email of the regular test customer.
pub const CUSTOMER_EMAIL: &str = "ada@example.com";

/// Email of a user whose token the backend stops accepting after login.
pub const STALE_EMAIL: &str = "stale@example.com";

const VALID_TOKEN: &str = "tok-ada";
const STALE_TOKEN: &str = "tok-stale";

/// Everything the mock backend stores or receives.
#[derive(Debug, Default)]
pub struct BackendData {
    pub addresses: Vec<Value>,
    pub cards: Vec<Value>,
    pub orders: Vec<Value>,
    pub signups: Vec<Value>,
    /// When set, `GET /roles` answers 503.
    pub roles_unavailable: bool,
}

/// Shared state of the mock backend.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    data: Arc<Mutex<BackendData>>,
}

impl MockBackend {
    /// Lock the recorded data for inspection.
    ///
    /// # Panics
    ///
    /// Panics if a handler panicked while holding the lock.
    pub fn data(&self) -> MutexGuard<'_, BackendData> {
        self.data.lock().expect("mock backend lock poisoned")
    }

    fn seeded() -> Self {
        let backend = Self::default();
        {
            let mut data = backend.data();
            data.addresses.push(json!({
                "id": 1,
                "title": "Home",
                "name": "Ada",
                "surname": "Lovelace",
                "phone": "+44 20 7946 0000",
                "neighborhood": "Marylebone",
                "district": "Westminster",
                "city": "London",
                "address": "12 St James's Square"
            }));
            data.addresses.push(json!({
                "id": 2,
                "title": "Office",
                "name": "Ada",
                "surname": "Lovelace",
                "phone": "+44 20 7946 0001",
                "neighborhood": "Holborn",
                "district": "Camden",
                "city": "London",
                "address": "1 Analytical Row"
            }));
            data.cards.push(json!({
                "id": 1,
                "card_no": "4111111111114242",
                "expire_month": 8,
                "expire_year": 2031,
                "name_on_card": "Ada Lovelace"
            }));
        }
        backend
    }
}

fn roles() -> Value {
    json!([
        {"id": 1, "code": "customer", "name": "Customer"},
        {"id": 2, "code": "store", "name": "Store"},
        {"id": 3, "code": "admin", "name": "Admin"}
    ])
}

async fn list_roles(State(backend): State<MockBackend>) -> Response {
    if backend.data().roles_unavailable {
        return message(StatusCode::SERVICE_UNAVAILABLE, "Roles are unavailable");
    }
    Json(roles()).into_response()
}

fn categories() -> Value {
    json!([
        {"id": 1, "code": "dress", "title": "Dresses", "gender": "k", "img": "", "rating": 4.8},
        {"id": 2, "code": "shirt", "title": "Shirts", "gender": "e", "img": "", "rating": 4.1}
    ])
}

fn products() -> Vec<Value> {
    vec![
        json!({
            "id": 1, "name": "Summer Dress", "description": "Light cotton dress.",
            "price": 100.0, "stock": 5, "category_id": 1, "rating": 4.6, "sell_count": 40,
            "images": [{"url": "https://img.example/dress.jpg", "index": 0}]
        }),
        json!({
            "id": 2, "name": "Linen Shirt", "description": "Breathable linen.",
            "price": 60.0, "stock": 3, "category_id": 2, "rating": 4.2, "sell_count": 12,
            "images": []
        }),
        json!({
            "id": 3, "name": "Wool Coat", "description": "Sold out for the season.",
            "price": 240.0, "stock": 0, "category_id": 1, "rating": 4.9, "sell_count": 80,
            "images": []
        }),
    ]
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| token == VALID_TOKEN)
}

async fn list_products(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let mut items = products();
    if let Some(category) = params.get("category").and_then(|c| c.parse::<i64>().ok()) {
        items.retain(|p| p["category_id"].as_i64() == Some(category));
    }
    if let Some(filter) = params.get("filter") {
        let filter = filter.to_lowercase();
        items.retain(|p| {
            p["name"]
                .as_str()
                .is_some_and(|name| name.to_lowercase().contains(&filter))
        });
    }
    let price = |p: &Value| p["price"].as_f64().unwrap_or_default();
    match params.get("sort").map(String::as_str) {
        Some("price:asc") => items.sort_by(|a, b| price(a).total_cmp(&price(b))),
        Some("price:desc") => items.sort_by(|a, b| price(b).total_cmp(&price(a))),
        _ => {}
    }
    let total = items.len();
    let offset = params.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    let limit = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(total);
    let page: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
    Json(json!({ "total": total, "products": page }))
}

async fn show_product(Path(id): Path<i64>) -> Response {
    products()
        .into_iter()
        .find(|p| p["id"].as_i64() == Some(id))
        .map_or_else(
            || message(StatusCode::NOT_FOUND, "Product not found"),
            |p| Json(p).into_response(),
        )
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"].as_str() != Some(PASSWORD) {
        return message(StatusCode::BAD_REQUEST, "Invalid email or password");
    }
    let token = match email {
        CUSTOMER_EMAIL => VALID_TOKEN,
        STALE_EMAIL => STALE_TOKEN,
        _ => return message(StatusCode::BAD_REQUEST, "Invalid email or password"),
    };
    Json(json!({ "token": token, "name": "Ada", "email": email, "role_id": 1 })).into_response()
}

async fn signup(State(backend): State<MockBackend>, Json(body): Json<Value>) -> Response {
    if body["email"].as_str() == Some(CUSTOMER_EMAIL) {
        return message(StatusCode::CONFLICT, "Email is already registered");
    }
    backend.data().signups.push(body);
    message(StatusCode::OK, "Signed up")
}

async fn list_addresses(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return message(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    Json(Value::Array(backend.data().addresses.clone())).into_response()
}

async fn add_address(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return message(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    let mut data = backend.data();
    body["id"] = json!(data.addresses.len() + 1);
    data.addresses.push(body);
    message(StatusCode::OK, "Address added")
}

async fn list_cards(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return message(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    Json(Value::Array(backend.data().cards.clone())).into_response()
}

async fn add_card(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return message(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    let mut data = backend.data();
    body["id"] = json!(data.cards.len() + 1);
    data.cards.push(body);
    message(StatusCode::OK, "Card added")
}

async fn create_order(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return message(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    let mut data = backend.data();
    data.orders.push(body);
    Json(json!({ "id": 500 + data.orders.len(), "message": "Order created" })).into_response()
}

fn backend_router(backend: MockBackend) -> Router {
    let api = Router::new()
        .route("/roles", get(list_roles))
        .route("/categories", get(|| async { Json(categories()) }))
        .route("/products", get(list_products))
        .route("/products/{id}", get(show_product))
        .route("/login", axum::routing::post(login))
        .route("/signup", axum::routing::post(signup))
        .route("/user/address", get(list_addresses).post(add_address))
        .route("/user/card", get(list_cards).post(add_card))
        .route("/order", axum::routing::post(create_order))
        .with_state(backend);
    Router::new().nest("/api", api)
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });
    addr
}

/// A running storefront wired to a mock backend.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub backend: MockBackend,
}

impl TestContext {
    /// Start the mock backend and the storefront.
    ///
    /// # Panics
    ///
    /// Panics if either server cannot be started.
    pub async fn start() -> Self {
        let backend = MockBackend::seeded();
        let backend_addr = serve(backend_router(backend.clone())).await;

        let api_url = format!("http://{backend_addr}/api");
        let config = StorefrontConfig::from_lookup(|key| match key {
            "BAZAAR_API_URL" => Some(api_url.clone()),
            _ => None,
        })
        .expect("Test configuration is valid");
        let state = AppState::new(config).expect("Failed to build storefront state");
        let storefront_addr = serve(bazaar_storefront::app(state)).await;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("http://{storefront_addr}"),
            backend,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a storefront page.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET a page and return its status and body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn page(&self, path: &str) -> (reqwest::StatusCode, String) {
        let response = self.get(path).await;
        let status = response.status();
        let body = response.text().await.expect("Failed to read body");
        (status, body)
    }

    /// POST a form to the storefront.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Log in as `email` with the shared test password.
    ///
    /// # Panics
    ///
    /// Panics if the login is not accepted.
    pub async fn login_as(&self, email: &str) {
        let response = self
            .post("/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    }

    /// Add `quantity` units of a product to the cart.
    ///
    /// # Panics
    ///
    /// Panics if the storefront does not redirect back.
    pub async fn add_to_cart(&self, product_id: i64, quantity: u32) {
        let id = product_id.to_string();
        let quantity = quantity.to_string();
        let response = self
            .post("/cart/add", &[("product_id", &id), ("quantity", &quantity)])
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    }
}

/// `Location` header of a redirect response.
///
/// # Panics
///
/// Panics if the response has no `Location` header.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("Response has no Location header")
        .to_string()
}
