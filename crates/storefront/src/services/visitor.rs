//! The visitor's session state.
//!
//! Handlers go through these helpers instead of touching session keys
//! directly, so login, logout and an expired backend token always reset the
//! same set of keys.

use bazaar_core::cart::{Cart, Favorites};
use bazaar_core::checkout::{AddressSelection, OrderDraft};
use bazaar_core::CardId;
use tower_sessions::Session;
use tower_sessions::cookie::time::Duration;
use tower_sessions::Expiry;

use crate::api::ApiError;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::session::{load, store};
use crate::models::{CurrentUser, session_keys};
use crate::services::flash::{self, Flash};
use crate::state::AppState;

/// Lifetime of a session whose owner ticked "remember me".
pub const REMEMBER_ME_DAYS: i64 = 30;

/// Inactivity timeout of every other session.
pub const SESSION_INACTIVITY_HOURS: i64 = 2;

/// How long a remembered user's data is trusted before `GET /verify`.
pub const VERIFY_INTERVAL_SECS: i64 = 60 * 60;

/// Message shown when the backend no longer accepts the visitor's token.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

pub async fn current_user(session: &Session) -> Result<Option<CurrentUser>, AppError> {
    Ok(session.get(session_keys::CURRENT_USER).await?)
}

pub async fn cart(session: &Session) -> Result<Cart, AppError> {
    Ok(load(session, session_keys::CART).await?)
}

pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), AppError> {
    Ok(store(session, session_keys::CART, cart).await?)
}

pub async fn favorites(session: &Session) -> Result<Favorites, AppError> {
    Ok(load(session, session_keys::FAVORITES).await?)
}

pub async fn save_favorites(session: &Session, favorites: &Favorites) -> Result<(), AppError> {
    Ok(store(session, session_keys::FAVORITES, favorites).await?)
}

pub async fn address_selection(session: &Session) -> Result<AddressSelection, AppError> {
    Ok(load(session, session_keys::CHECKOUT_ADDRESSES).await?)
}

pub async fn save_address_selection(
    session: &Session,
    selection: &AddressSelection,
) -> Result<(), AppError> {
    Ok(store(session, session_keys::CHECKOUT_ADDRESSES, selection).await?)
}

pub async fn order_draft(session: &Session) -> Result<Option<OrderDraft>, AppError> {
    Ok(session.get(session_keys::ORDER_DRAFT).await?)
}

pub async fn save_order_draft(session: &Session, draft: &OrderDraft) -> Result<(), AppError> {
    Ok(store(session, session_keys::ORDER_DRAFT, draft).await?)
}

pub async fn selected_card(session: &Session) -> Result<Option<CardId>, AppError> {
    Ok(session.get(session_keys::SELECTED_CARD).await?)
}

pub async fn save_selected_card(session: &Session, card: CardId) -> Result<(), AppError> {
    Ok(store(session, session_keys::SELECTED_CARD, &card).await?)
}

/// Forget the checkout wizard state.
pub async fn clear_checkout(session: &Session) -> Result<(), AppError> {
    session
        .remove::<AddressSelection>(session_keys::CHECKOUT_ADDRESSES)
        .await?;
    session.remove::<OrderDraft>(session_keys::ORDER_DRAFT).await?;
    session.remove::<CardId>(session_keys::SELECTED_CARD).await?;
    Ok(())
}

/// Store the logged-in user.
///
/// The session id is rotated on login. With `remember` the session outlives
/// the browser for [`REMEMBER_ME_DAYS`]; otherwise it ends after
/// [`SESSION_INACTIVITY_HOURS`] without activity.
pub async fn log_in(session: &Session, user: &CurrentUser, remember: bool) -> Result<(), AppError> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    session.insert(session_keys::REMEMBER_ME, remember).await?;
    session
        .insert(session_keys::USER_VERIFIED_AT, chrono::Utc::now().timestamp())
        .await?;
    session.set_expiry(Some(session_expiry(remember)));
    set_sentry_user(&user.email);
    Ok(())
}

/// Forget the logged-in user and their checkout state. Cart and favorites
/// stay with the browser.
pub async fn log_out(session: &Session) -> Result<(), AppError> {
    session.remove::<CurrentUser>(session_keys::CURRENT_USER).await?;
    session.remove::<bool>(session_keys::REMEMBER_ME).await?;
    session.remove::<i64>(session_keys::USER_VERIFIED_AT).await?;
    clear_checkout(session).await?;
    session.set_expiry(Some(session_expiry(false)));
    session.cycle_id().await?;
    clear_sentry_user();
    Ok(())
}

/// Whether the visitor asked to be remembered at login.
pub async fn is_remembered(session: &Session) -> Result<bool, AppError> {
    Ok(load(session, session_keys::REMEMBER_ME).await?)
}

/// The logged-in user, re-checked with the backend when a remembered
/// session has not been verified for [`VERIFY_INTERVAL_SECS`].
///
/// A rejected token logs the visitor out. Other backend failures keep the
/// stored user.
pub async fn refresh_user(state: &AppState, session: &Session) -> Result<Option<CurrentUser>, AppError> {
    let Some(user) = current_user(session).await? else {
        return Ok(None);
    };
    if !is_remembered(session).await? {
        return Ok(Some(user));
    }

    let now = chrono::Utc::now().timestamp();
    let verified_at: Option<i64> = session.get(session_keys::USER_VERIFIED_AT).await?;
    if verified_at.is_some_and(|at| now - at < VERIFY_INTERVAL_SECS) {
        return Ok(Some(user));
    }

    match state.api().verify(&user.token).await {
        Ok(fresh) => {
            let user = user.refreshed(fresh);
            session.insert(session_keys::CURRENT_USER, &user).await?;
            session.insert(session_keys::USER_VERIFIED_AT, now).await?;
            Ok(Some(user))
        }
        Err(ApiError::Unauthorized) => {
            tracing::info!("Remembered session token rejected, logging out");
            log_out(session).await?;
            flash::push(session, Flash::info(SESSION_EXPIRED_MESSAGE)).await;
            Ok(None)
        }
        Err(e) => {
            tracing::warn!("Failed to verify remembered session: {e}");
            Ok(Some(user))
        }
    }
}

/// Expiry policy for a session.
#[must_use]
pub fn session_expiry(remember: bool) -> Expiry {
    if remember {
        Expiry::OnInactivity(Duration::days(REMEMBER_ME_DAYS))
    } else {
        Expiry::OnInactivity(Duration::hours(SESSION_INACTIVITY_HOURS))
    }
}

/// Turn a failed account call into the handler's error.
///
/// An expired token logs the visitor out and sends them to the login page,
/// returning to `from` afterwards.
pub async fn account_error(session: &Session, err: ApiError, from: &str) -> AppError {
    if !matches!(err, ApiError::Unauthorized) {
        return AppError::Api(err);
    }

    tracing::info!("Backend rejected session token, logging out");
    if let Err(e) = log_out(session).await {
        return e;
    }
    flash::push(session, Flash::info(SESSION_EXPIRED_MESSAGE)).await;
    AppError::LoginRequired(from.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bazaar_core::RoleId;
    use secrecy::SecretString;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user() -> CurrentUser {
        CurrentUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role_id: RoleId::new(3),
            token: SecretString::from("tok"),
        }
    }

    #[tokio::test]
    async fn test_login_and_logout_keep_cart() {
        let session = session();
        let mut cart = Cart::new();
        cart.add(bazaar_core::catalog::Product {
            id: bazaar_core::ProductId::new(1),
            name: "Shirt".to_string(),
            description: String::new(),
            price: bazaar_core::Price::from_cents(1000),
            stock: 1,
            store_id: None,
            category_id: None,
            rating: 0.0,
            sell_count: 0,
            images: Vec::new(),
        });
        save_cart(&session, &cart).await.unwrap();

        log_in(&session, &user(), true).await.unwrap();
        assert!(current_user(&session).await.unwrap().is_some());
        assert!(is_remembered(&session).await.unwrap());

        let mut selection = AddressSelection::default();
        selection.select_shipping(bazaar_core::AddressId::new(1));
        save_address_selection(&session, &selection).await.unwrap();

        log_out(&session).await.unwrap();
        assert!(current_user(&session).await.unwrap().is_none());
        assert!(!is_remembered(&session).await.unwrap());
        assert_eq!(address_selection(&session).await.unwrap(), AddressSelection::default());
        assert_eq!(self::cart(&session).await.unwrap().total_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_logs_out() {
        let session = session();
        log_in(&session, &user(), false).await.unwrap();

        let err = account_error(&session, ApiError::Unauthorized, "/checkout").await;
        assert!(matches!(err, AppError::LoginRequired(from) if from == "/checkout"));
        assert!(current_user(&session).await.unwrap().is_none());
        let flashes = flash::take(&session).await;
        assert_eq!(flashes[0].message, SESSION_EXPIRED_MESSAGE);
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let session = session();
        log_in(&session, &user(), false).await.unwrap();

        let err = account_error(&session, ApiError::NotFound("/x".to_string()), "/checkout").await;
        assert!(matches!(err, AppError::Api(ApiError::NotFound(_))));
        assert!(current_user(&session).await.unwrap().is_some());
    }
}
