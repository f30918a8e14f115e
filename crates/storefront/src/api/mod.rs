//! Client for the Bazaar backend REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, roles, the catalog,
//!   saved addresses, saved cards and orders. Nothing is persisted locally.
//! - Catalog and role reads are cached in memory via `moka`.
//! - Account endpoints take the visitor's token in the `Authorization` header
//!   and are never cached.
//! - No retries: a failed call surfaces once, as a flash message.
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//! let page = client.products(&ProductQuery::default()).await?;
//! let addresses = client.addresses(&user.token).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token is missing, expired or revoked.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Build an error from a non-success response body.
    ///
    /// The backend answers failures with `{"message": "..."}`; anything else
    /// is kept verbatim (truncated). A 401 only means an expired session when
    /// the request carried a token; on `/login` it is a wrong password.
    pub(crate) fn from_status(status: StatusCode, path: &str, body: &str, authorized: bool) -> Self {
        match status {
            StatusCode::UNAUTHORIZED if authorized => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound(path.to_string()),
            _ => {
                let message = serde_json::from_str::<ApiMessage>(body)
                    .map(|m| m.message)
                    .unwrap_or_else(|_| body.chars().take(200).collect());
                Self::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    /// Message to show the visitor, or `fallback` when the backend gave none.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Whether the failure is on our side or the backend's, rather than the
    /// visitor's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Unauthorized | Self::NotFound(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_reads_message_body() {
        let err = ApiError::from_status(
            StatusCode::CONFLICT,
            "/signup",
            r#"{"message":"Email already registered"}"#,
            false,
        );
        assert!(matches!(&err, ApiError::Api { status: 409, message } if message == "Email already registered"));
        assert_eq!(err.user_message("Registration failed"), "Email already registered");
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_from_status_keeps_plain_bodies() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "/order", "upstream down", true);
        assert!(matches!(&err, ApiError::Api { status: 502, message } if message == "upstream down"));
        assert!(err.is_server_error());
    }

    #[test]
    fn test_from_status_special_cases() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "/user/card", "", true),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "/products/9", "", false),
            ApiError::NotFound(path) if path == "/products/9"
        ));
    }

    #[test]
    fn test_wrong_password_is_not_an_expired_session() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            "/login",
            r#"{"message":"Invalid credentials"}"#,
            false,
        );
        assert_eq!(err.user_message("Login failed"), "Invalid credentials");
    }

    #[test]
    fn test_user_message_falls_back() {
        let err = ApiError::Api {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(err.user_message("Order failed"), "Order failed");
        assert_eq!(ApiError::Unauthorized.user_message("Login failed"), "Login failed");
    }
}
