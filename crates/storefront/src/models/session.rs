//! Session-related types.
//!
//! The session holds everything the storefront knows about a visitor between
//! requests: who is logged in, the cart, favorites, the checkout wizard state
//! and pending flash messages. Business records stay in the backend.

use std::fmt;

use bazaar_core::RoleId;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tower_sessions::Session;

use crate::api::AuthenticatedUser;

/// Session-stored user identity.
///
/// The backend token is kept secret so it never shows up in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub name: String,
    pub email: String,
    pub role_id: RoleId,
    #[serde(serialize_with = "serialize_token", deserialize_with = "deserialize_token")]
    pub token: SecretString,
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role_id", &self.role_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl From<AuthenticatedUser> for CurrentUser {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            name: user.name,
            email: user.email,
            role_id: user.role_id,
            token: SecretString::from(user.token),
        }
    }
}

impl CurrentUser {
    /// Apply fresh user data from `GET /verify`, keeping the current token
    /// unless the backend issued a new one.
    #[must_use]
    pub fn refreshed(self, fresh: AuthenticatedUser) -> Self {
        let token = if fresh.token.is_empty() {
            self.token
        } else {
            SecretString::from(fresh.token)
        };
        Self {
            name: fresh.name,
            email: fresh.email,
            role_id: fresh.role_id,
            token,
        }
    }
}

fn serialize_token<S: Serializer>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(token.expose_secret())
}

fn deserialize_token<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Session keys.
pub mod keys {
    /// The logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Whether the visitor ticked "remember me" at login.
    pub const REMEMBER_ME: &str = "remember_me";

    /// Unix time the backend last confirmed the user's token.
    pub const USER_VERIFIED_AT: &str = "user_verified_at";

    /// The visitor's cart.
    pub const CART: &str = "cart";

    /// The visitor's favorites.
    pub const FAVORITES: &str = "favorites";

    /// Address step of the checkout wizard.
    pub const CHECKOUT_ADDRESSES: &str = "checkout_addresses";

    /// Order draft handed from the address step to the payment step.
    pub const ORDER_DRAFT: &str = "order_draft";

    /// Card picked on the payment step.
    pub const SELECTED_CARD: &str = "selected_card";

    /// Flash messages waiting to be shown.
    pub const FLASH: &str = "flash";
}

/// Read a value from the session, falling back to its default when absent.
///
/// # Errors
///
/// Returns an error if the session store fails or the stored value no longer
/// deserializes.
pub async fn load<T>(session: &Session, key: &str) -> Result<T, tower_sessions::session::Error>
where
    T: Default + DeserializeOwned,
{
    Ok(session.get::<T>(key).await?.unwrap_or_default())
}

/// Write a value to the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn store<T>(session: &Session, key: &str, value: &T) -> Result<(), tower_sessions::session::Error>
where
    T: Serialize + Send + Sync,
{
    session.insert(key, value).await
}
