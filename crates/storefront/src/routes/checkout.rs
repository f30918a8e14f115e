//! Checkout route handlers.
//!
//! Checkout is a two-step wizard. The address step stores the chosen
//! addresses and an order draft (selected cart lines plus totals) in the
//! session; the payment step reads the draft, validates the card and CVV,
//! and places the order. The CVV only ever lives in the pay request.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::account::Address;
use bazaar_core::checkout::{AddressSelection, CheckoutError, OrderDraft, PaymentAttempt};
use bazaar_core::pricing::OrderSummary;
use bazaar_core::validation::{FieldErrors, NewAddressForm, NewCardForm};
use bazaar_core::{AddressId, CardId};
use chrono::Datelike;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ApiError, OrderRequest};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::services::flash::{self, Flash};
use crate::services::visitor;
use crate::state::AppState;
use crate::views::{AddressOption, CardOption, Layout};

/// Toast shown after the backend accepted an order.
pub const ORDER_CREATED_MESSAGE: &str = "Your order has been created successfully!";

const ADDRESS_STEP: &str = "/checkout";
const PAYMENT_STEP: &str = "/checkout/payment";

/// Current calendar year, the lower bound for card expiry years.
#[must_use]
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Parse an id from an optional form field; blank or malformed means none.
fn parse_id<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

// =============================================================================
// Templates
// =============================================================================

/// Address step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/address.html")]
pub struct AddressTemplate {
    pub layout: Layout,
    pub shipping_options: Vec<AddressOption>,
    pub billing_options: Vec<AddressOption>,
    pub same_as_shipping: bool,
    pub show_billing: bool,
    pub can_continue: bool,
    pub item_count: u32,
    pub summary: OrderSummary,
}

/// New address form template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/new_address.html")]
pub struct NewAddressTemplate {
    pub layout: Layout,
    pub form: NewAddressForm,
    pub errors: FieldErrors,
}

/// Payment step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub layout: Layout,
    pub cards: Vec<CardOption>,
    pub can_pay: bool,
    pub item_count: u32,
    pub summary: OrderSummary,
    pub card_form: NewCardForm,
    pub card_errors: FieldErrors,
    pub show_card_form: bool,
}

// =============================================================================
// Forms
// =============================================================================

/// Address step submission.
#[derive(Debug, Default, Deserialize)]
pub struct AddressForm {
    pub shipping_id: Option<String>,
    pub billing_id: Option<String>,
    pub same_as_shipping: Option<String>,
}

impl AddressForm {
    /// Apply the submitted choices to `selection`.
    pub fn apply(&self, selection: &mut AddressSelection) {
        selection.set_same_as_shipping(self.same_as_shipping.is_some());
        if let Some(id) = parse_id::<AddressId>(self.shipping_id.as_deref()) {
            selection.select_shipping(id);
        }
        if !selection.same_as_shipping()
            && let Some(id) = parse_id::<AddressId>(self.billing_id.as_deref())
        {
            selection.select_billing(id);
        }
    }
}

/// Billing mode switch, used when scripts are disabled.
#[derive(Debug, Deserialize)]
pub struct BillingModeForm {
    pub mode: String,
    pub shipping_id: Option<String>,
}

/// Pay form. The CVV is dropped with the form at the end of the request.
#[derive(Deserialize)]
pub struct PayForm {
    pub card_id: Option<String>,
    #[serde(default)]
    pub cvv: String,
}

// =============================================================================
// Address Step
// =============================================================================

/// Saved addresses of the visitor. Failures other than an expired token are
/// reported through `layout` and yield an empty list.
async fn load_addresses(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    layout: &mut Layout,
) -> Result<Vec<Address>> {
    match state.api().addresses(&user.token).await {
        Ok(addresses) => Ok(addresses),
        Err(ApiError::Unauthorized) => {
            Err(visitor::account_error(session, ApiError::Unauthorized, ADDRESS_STEP).await)
        }
        Err(e) => {
            tracing::warn!("Failed to load addresses: {e}");
            layout.flash(Flash::error(e.user_message("Could not load your addresses")));
            Ok(Vec::new())
        }
    }
}

/// Display the address step.
#[instrument(skip_all)]
pub async fn address_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let cart = visitor::cart(&session).await?;
    if !cart.has_selection() {
        flash::push(&session, Flash::error(CheckoutError::EmptySelection.to_string())).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let mut layout = Layout::load(&state, &session).await?;
    let addresses = load_addresses(&state, &session, &user, &mut layout).await?;

    let mut selection = visitor::address_selection(&session).await?;
    // Stale choices are dropped quietly here; saving reports them.
    let _ = selection.retain_known(&addresses);
    visitor::save_address_selection(&session, &selection).await?;

    let summary = state.shipping().summarize(&cart);
    let item_count = cart.selected().map(|item| item.count).sum();

    Ok(AddressTemplate {
        layout,
        shipping_options: addresses
            .iter()
            .map(|a| AddressOption::new(a, selection.shipping_id()))
            .collect(),
        billing_options: addresses
            .iter()
            .map(|a| AddressOption::new(a, selection.billing_id()))
            .collect(),
        same_as_shipping: selection.same_as_shipping(),
        show_billing: selection.shows_billing_picker(),
        can_continue: selection.can_continue(),
        item_count,
        summary,
    }
    .into_response())
}

/// Save the chosen addresses and continue to payment.
#[instrument(skip_all)]
pub async fn save_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Redirect> {
    let addresses = match state.api().addresses(&user.token).await {
        Ok(addresses) => addresses,
        Err(e @ ApiError::Unauthorized) => {
            return Err(visitor::account_error(&session, e, ADDRESS_STEP).await);
        }
        Err(e) => {
            tracing::warn!("Failed to load addresses: {e}");
            flash::push(&session, Flash::error(e.user_message("Could not load your addresses")))
                .await;
            return Ok(Redirect::to(ADDRESS_STEP));
        }
    };

    let mut selection = visitor::address_selection(&session).await?;
    form.apply(&mut selection);
    let known = selection.retain_known(&addresses);
    visitor::save_address_selection(&session, &selection).await?;

    let resolved = match known.and_then(|()| selection.resolve()) {
        Ok(resolved) => resolved,
        Err(e) => {
            flash::push(&session, Flash::error(e.to_string())).await;
            return Ok(Redirect::to(ADDRESS_STEP));
        }
    };

    let cart = visitor::cart(&session).await?;
    match OrderDraft::build(resolved, &cart, state.shipping()) {
        Ok(draft) => {
            visitor::save_order_draft(&session, &draft).await?;
            add_breadcrumb("checkout", "Addresses saved", None);
            Ok(Redirect::to(PAYMENT_STEP))
        }
        Err(e) => {
            flash::push(&session, Flash::error(e.to_string())).await;
            Ok(Redirect::to("/cart"))
        }
    }
}

/// Switch between reusing the shipping address for billing and picking one.
#[instrument(skip_all)]
pub async fn billing_mode(
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<BillingModeForm>,
) -> Result<Redirect> {
    let mut selection = visitor::address_selection(&session).await?;
    if let Some(id) = parse_id::<AddressId>(form.shipping_id.as_deref()) {
        selection.select_shipping(id);
    }
    match form.mode.as_str() {
        "same" => selection.set_same_as_shipping(true),
        "separate" => selection.set_same_as_shipping(false),
        other => tracing::debug!(mode = other, "Ignoring unknown billing mode"),
    }
    visitor::save_address_selection(&session, &selection).await?;
    Ok(Redirect::to(ADDRESS_STEP))
}

/// Display the new address form.
#[instrument(skip_all)]
pub async fn new_address_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
) -> Result<NewAddressTemplate> {
    Ok(NewAddressTemplate {
        layout: Layout::load(&state, &session).await?,
        form: NewAddressForm::default(),
        errors: FieldErrors::new(),
    })
}

/// Save a new address and return to the address step.
#[instrument(skip_all)]
pub async fn create_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<NewAddressForm>,
) -> Result<Response> {
    let address = match form.validate() {
        Ok(address) => address,
        Err(errors) => {
            let template = NewAddressTemplate {
                layout: Layout::load(&state, &session).await?,
                form,
                errors,
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response());
        }
    };

    match state.api().add_address(&user.token, &address).await {
        Ok(()) => {
            flash::push(&session, Flash::success("Address saved")).await;
            Ok(Redirect::to(ADDRESS_STEP).into_response())
        }
        Err(e @ ApiError::Unauthorized) => {
            Err(visitor::account_error(&session, e, "/checkout/address/new").await)
        }
        Err(e) => {
            tracing::warn!("Failed to save address: {e}");
            let mut layout = Layout::load(&state, &session).await?;
            layout.flash(Flash::error(e.user_message("Could not save the address")));
            let template = NewAddressTemplate {
                layout,
                form,
                errors: FieldErrors::new(),
            };
            Ok((StatusCode::BAD_GATEWAY, template).into_response())
        }
    }
}

// =============================================================================
// Payment Step
// =============================================================================

/// The order draft, or a redirect back to the address step.
async fn require_draft(session: &Session) -> Result<std::result::Result<OrderDraft, Redirect>> {
    match visitor::order_draft(session).await? {
        Some(draft) => Ok(Ok(draft)),
        None => {
            flash::push(session, Flash::info("Please choose your addresses first.")).await;
            Ok(Err(Redirect::to(ADDRESS_STEP)))
        }
    }
}

async fn render_payment(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    draft: &OrderDraft,
    card_form: NewCardForm,
    card_errors: FieldErrors,
) -> Result<PaymentTemplate> {
    let mut layout = Layout::load(state, session).await?;
    let cards = match state.api().cards(&user.token).await {
        Ok(cards) => cards,
        Err(e @ ApiError::Unauthorized) => {
            return Err(visitor::account_error(session, e, PAYMENT_STEP).await);
        }
        Err(e) => {
            tracing::warn!("Failed to load cards: {e}");
            layout.flash(Flash::error(e.user_message("Could not load your cards")));
            Vec::new()
        }
    };

    let selected = visitor::selected_card(session)
        .await?
        .filter(|id| cards.iter().any(|c| c.id == *id));

    Ok(PaymentTemplate {
        layout,
        cards: cards.iter().map(|c| CardOption::new(c, selected)).collect(),
        can_pay: selected.is_some(),
        item_count: draft.item_count(),
        summary: draft.summary,
        show_card_form: cards.is_empty() || !card_errors.is_empty(),
        card_form,
        card_errors,
    })
}

/// Display the payment step.
#[instrument(skip_all)]
pub async fn payment_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let draft = match require_draft(&session).await? {
        Ok(draft) => draft,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    Ok(render_payment(
        &state,
        &session,
        &user,
        &draft,
        NewCardForm::default(),
        FieldErrors::new(),
    )
    .await?
    .into_response())
}

/// Save a new card and return to the payment step.
#[instrument(skip_all)]
pub async fn create_card(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<NewCardForm>,
) -> Result<Response> {
    let draft = match require_draft(&session).await? {
        Ok(draft) => draft,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let card = match form.validate(current_year()) {
        Ok(card) => card,
        Err(errors) => {
            let template = render_payment(&state, &session, &user, &draft, form, errors).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response());
        }
    };

    match state.api().add_card(&user.token, &card).await {
        Ok(()) => {
            flash::push(&session, Flash::success("Card saved")).await;
        }
        Err(e @ ApiError::Unauthorized) => {
            return Err(visitor::account_error(&session, e, PAYMENT_STEP).await);
        }
        Err(e) => {
            tracing::warn!("Failed to save card: {e}");
            flash::push(&session, Flash::error(e.user_message("Could not save the card"))).await;
        }
    }
    Ok(Redirect::to(PAYMENT_STEP).into_response())
}

/// Pay with a saved card and place the order.
#[instrument(skip_all)]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PayForm>,
) -> Result<Redirect> {
    let Some(draft) = visitor::order_draft(&session).await? else {
        flash::push(&session, Flash::info("Please choose your addresses first.")).await;
        return Ok(Redirect::to(ADDRESS_STEP));
    };

    let card_id = parse_id::<CardId>(form.card_id.as_deref());
    if let Some(id) = card_id {
        visitor::save_selected_card(&session, id).await?;
    }

    let attempt = match PaymentAttempt::new(card_id, &form.cvv) {
        Ok(attempt) => attempt,
        Err(e) => {
            flash::push(&session, Flash::error(e.to_string())).await;
            return Ok(Redirect::to(PAYMENT_STEP));
        }
    };

    let cards = match state.api().cards(&user.token).await {
        Ok(cards) => cards,
        Err(e @ ApiError::Unauthorized) => {
            return Err(visitor::account_error(&session, e, PAYMENT_STEP).await);
        }
        Err(e) => {
            tracing::warn!("Failed to load cards: {e}");
            flash::push(&session, Flash::error(e.user_message("Order failed"))).await;
            return Ok(Redirect::to(PAYMENT_STEP));
        }
    };

    let card = match attempt.card(&cards) {
        Ok(card) => card,
        Err(e) => {
            flash::push(&session, Flash::error(e.to_string())).await;
            return Ok(Redirect::to(PAYMENT_STEP));
        }
    };

    let order = OrderRequest::new(&draft, card, &attempt, chrono::Local::now().naive_local());
    match state.api().create_order(&user.token, &order).await {
        Ok(created) => {
            let mut cart = visitor::cart(&session).await?;
            cart.remove_ordered(&draft.items);
            visitor::save_cart(&session, &cart).await?;
            visitor::clear_checkout(&session).await?;

            tracing::info!(
                order_id = ?created.id,
                total = %draft.summary.total,
                "Order created"
            );
            add_breadcrumb("checkout", "Order created", None);
            flash::push(&session, Flash::success(ORDER_CREATED_MESSAGE)).await;
            Ok(Redirect::to("/"))
        }
        Err(e @ ApiError::Unauthorized) => {
            Err(visitor::account_error(&session, e, PAYMENT_STEP).await)
        }
        Err(e) => {
            tracing::warn!("Order failed: {e}");
            flash::push(&session, Flash::error(e.user_message("Order failed"))).await;
            Ok(Redirect::to(PAYMENT_STEP))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_ignores_blank_and_garbage() {
        assert_eq!(parse_id::<AddressId>(Some(" 7 ")), Some(AddressId::new(7)));
        assert_eq!(parse_id::<AddressId>(Some("")), None);
        assert_eq!(parse_id::<AddressId>(Some("abc")), None);
        assert_eq!(parse_id::<AddressId>(None), None);
    }

    #[test]
    fn test_address_form_mirrors_shipping_when_same() {
        let form = AddressForm {
            shipping_id: Some("4".to_string()),
            billing_id: Some("9".to_string()),
            same_as_shipping: Some("on".to_string()),
        };
        let mut selection = AddressSelection::default();
        form.apply(&mut selection);

        assert_eq!(selection.shipping_id(), Some(AddressId::new(4)));
        assert_eq!(selection.billing_id(), Some(AddressId::new(4)));
        assert!(selection.can_continue());
    }

    #[test]
    fn test_address_form_separate_billing() {
        let form = AddressForm {
            shipping_id: Some("4".to_string()),
            billing_id: Some("9".to_string()),
            same_as_shipping: None,
        };
        let mut selection = AddressSelection::default();
        form.apply(&mut selection);

        assert!(!selection.same_as_shipping());
        assert!(selection.shows_billing_picker());
        assert_eq!(selection.billing_id(), Some(AddressId::new(9)));
    }

    #[test]
    fn test_current_year_is_plausible() {
        assert!(current_year() >= 2024);
    }
}
