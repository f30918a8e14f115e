//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions. Sessions hold UI state
//! only (cart, favorites, checkout wizard, backend token), so a restart
//! costs visitors their cart but never business data.

use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::services::visitor::session_expiry;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bazaar_session";

/// Create the session layer with an in-memory store.
///
/// Sessions expire after inactivity; "remember me" extends that per session
/// at login.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(session_expiry(false))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
