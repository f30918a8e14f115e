//! Types the storefront keeps in the visitor's session.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
