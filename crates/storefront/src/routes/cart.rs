//! Cart route handlers.
//!
//! Every mutation is a form POST that updates the session cart and redirects
//! back to the page it came from, so the header dropdown and the cart page
//! share the same actions.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use bazaar_core::cart::Cart;
use bazaar_core::pricing::OrderSummary;
use bazaar_core::{Price, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::ApiError;
use crate::error::Result;
use crate::filters;
use crate::routes::redirect_back;
use crate::services::flash::{self, Flash};
use crate::services::visitor;
use crate::state::AppState;
use crate::views::{CartLine, Layout, categories_or_empty};

/// Most units of one product a single add can request.
const MAX_ADD_QUANTITY: u32 = 99;

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLine>,
    pub summary: OrderSummary,
    pub can_checkout: bool,
    pub amount_to_free_shipping: Option<Price>,
}

/// Add-to-cart form.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    pub return_to: Option<String>,
}

/// Form acting on one existing cart line.
#[derive(Debug, Deserialize)]
pub struct LineForm {
    pub product_id: ProductId,
    pub return_to: Option<String>,
}

/// Display the cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CartTemplate> {
    let layout = Layout::load(&state, &session).await?;
    let cart = visitor::cart(&session).await?;
    let categories = categories_or_empty(&state).await;
    let summary = state.shipping().summarize(&cart);

    Ok(CartTemplate {
        layout,
        lines: CartLine::lines(&cart, &categories),
        can_checkout: cart.has_selection(),
        amount_to_free_shipping: summary.amount_to_free_shipping(),
        summary,
    })
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddForm>,
) -> Result<Redirect> {
    let back = redirect_back(form.return_to.as_deref(), "/cart");

    let product = match state.api().product(form.product_id).await {
        Ok(product) => product,
        Err(ApiError::NotFound(_)) => {
            flash::push(&session, Flash::error("This product is no longer available.")).await;
            return Ok(back);
        }
        Err(e) => {
            tracing::warn!("Failed to load product {}: {e}", form.product_id);
            flash::push(&session, Flash::error(e.user_message("Could not add to cart"))).await;
            return Ok(back);
        }
    };

    if !product.in_stock() {
        flash::push(&session, Flash::error("This product is out of stock.")).await;
        return Ok(back);
    }

    let quantity = form.quantity.unwrap_or(1).clamp(1, MAX_ADD_QUANTITY);
    let name = product.name.clone();
    let mut cart = visitor::cart(&session).await?;
    cart.add_many(product, quantity);
    visitor::save_cart(&session, &cart).await?;

    tracing::info!(product_id = %form.product_id, quantity, "Added to cart");
    flash::push(&session, Flash::success(format!("{name} added to your cart."))).await;
    Ok(back)
}

async fn update_line(
    session: &Session,
    form: &LineForm,
    action: impl FnOnce(&mut Cart, ProductId) -> bool,
) -> Result<Redirect> {
    let mut cart = visitor::cart(session).await?;
    if action(&mut cart, form.product_id) {
        visitor::save_cart(session, &cart).await?;
    }
    Ok(redirect_back(form.return_to.as_deref(), "/cart"))
}

/// Add one unit of a cart line.
#[instrument(skip(session))]
pub async fn increase(session: Session, Form(form): Form<LineForm>) -> Result<Redirect> {
    update_line(&session, &form, Cart::increase).await
}

/// Remove one unit of a cart line; the line goes away at zero.
#[instrument(skip(session))]
pub async fn decrease(session: Session, Form(form): Form<LineForm>) -> Result<Redirect> {
    update_line(&session, &form, Cart::decrease).await
}

/// Remove a cart line.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<LineForm>) -> Result<Redirect> {
    update_line(&session, &form, Cart::remove).await
}

/// Toggle whether a cart line takes part in checkout.
#[instrument(skip(session))]
pub async fn toggle(session: Session, Form(form): Form<LineForm>) -> Result<Redirect> {
    update_line(&session, &form, Cart::toggle_checked).await
}
