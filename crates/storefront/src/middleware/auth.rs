//! Authentication extractors.
//!
//! Provides extractors for requiring a logged-in visitor in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::routes::auth::login_url;

/// Extractor that requires a logged-in visitor.
///
/// Anonymous visitors are redirected to `/login?from=<path>` and come back
/// after logging in.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the visitor is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page, returning to the given path afterwards.
    RedirectToLogin(String),
    /// The session layer is missing.
    NoSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(from) => Redirect::to(&login_url(&from)).into_response(),
            Self::NoSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::NoSession)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                let from = parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
                AuthRejection::RedirectToLogin(from)
            })?;

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Request, header::LOCATION};
    use bazaar_core::RoleId;
    use secrecy::SecretString;
    use tower_sessions::MemoryStore;

    use super::*;

    fn parts_with_session(uri: &str, session: Session) -> Parts {
        let (mut parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        parts.extensions.insert(session);
        parts
    }

    #[tokio::test]
    async fn test_anonymous_visitor_is_sent_to_login() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut parts = parts_with_session("/checkout/payment?step=2", session);

        let Err(rejection) = RequireAuth::from_request_parts(&mut parts, &()).await else {
            panic!("expected rejection");
        };
        let response = rejection.into_response();
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/login?from=%2Fcheckout%2Fpayment%3Fstep%3D2"
        );
    }

    #[tokio::test]
    async fn test_logged_in_visitor_passes() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let user = CurrentUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role_id: RoleId::new(3),
            token: SecretString::from("tok"),
        };
        session.insert(session_keys::CURRENT_USER, &user).await.unwrap();
        let mut parts = parts_with_session("/checkout", session);

        let RequireAuth(found) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.email, "ada@example.com");
    }
}
