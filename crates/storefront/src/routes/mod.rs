//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (categories, best sellers)
//! GET  /health                 - Health check
//!
//! # Shop
//! GET  /shop                   - Product listing (?category&filter&sort&page)
//! GET  /shop/{gender}/{category}/{category_id}                    - Category listing
//! GET  /shop/{gender}/{category}/{category_id}/{slug}/{product_id} - Product detail
//! GET  /product/{id}           - Redirect to the canonical product page
//!
//! # Pages
//! GET  /about, /contact, /pricing
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add a product (quantity, return_to)
//! POST /cart/increase          - One more unit of a line
//! POST /cart/decrease          - One less unit; removes the line at zero
//! POST /cart/remove            - Remove a line
//! POST /cart/toggle            - Include or exclude a line from checkout
//!
//! # Favorites
//! GET  /favorites              - Favorites page
//! POST /favorites/toggle       - Add or remove a product
//! POST /favorites/remove       - Remove a product
//!
//! # Checkout (requires auth)
//! GET  /checkout                      - Address step
//! POST /checkout/address              - Save addresses, continue to payment
//! POST /checkout/address/billing-mode - Same-as-shipping switch
//! GET  /checkout/address/new          - New address form
//! POST /checkout/address/new          - Save new address
//! GET  /checkout/payment              - Payment step
//! POST /checkout/payment/cards        - Save a new card
//! POST /checkout/payment              - Pay and create the order
//!
//! # Auth
//! GET  /login, POST /login     - Login (?from=<local path>)
//! GET  /register, POST /register - Registration (?role_id=<id>)
//! POST /logout                 - Logout
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod favorites;
pub mod home;
pub mod pages;
pub mod shop;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

/// Redirect to `return_to` when it is a local path, else to `fallback`.
#[must_use]
pub fn redirect_back(return_to: Option<&str>, fallback: &str) -> Redirect {
    let target = return_to
        .filter(|path| auth::is_local_path(path))
        .unwrap_or(fallback);
    Redirect::to(target)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::index))
        .route("/{gender}/{category}/{category_id}", get(shop::category))
        .route(
            "/{gender}/{category}/{category_id}/{slug}/{product_id}",
            get(shop::show),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/increase", post(cart::increase))
        .route("/decrease", post(cart::decrease))
        .route("/remove", post(cart::remove))
        .route("/toggle", post(cart::toggle))
}

/// Create the favorites routes router.
pub fn favorites_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route("/toggle", post(favorites::toggle))
        .route("/remove", post(favorites::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::address_page))
        .route("/address", post(checkout::save_address))
        .route("/address/billing-mode", post(checkout::billing_mode))
        .route(
            "/address/new",
            get(checkout::new_address_page).post(checkout::create_address),
        )
        .route(
            "/payment",
            get(checkout::payment_page).post(checkout::pay),
        )
        .route("/payment/cards", post(checkout::create_card))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact))
        .route("/pricing", get(pages::pricing))
        .route("/product/{id}", get(shop::permalink))
        .nest("/shop", shop_routes())
        .nest("/cart", cart_routes())
        .nest("/favorites", favorites_routes())
        .nest("/checkout", checkout_routes())
        .merge(auth_routes())
}
