//! Services shared by route handlers.
//!
//! - `flash` - One-shot notifications carried across a redirect
//! - `visitor` - The visitor's session state: user, cart, favorites, checkout

pub mod flash;
pub mod visitor;

pub use flash::{Flash, FlashLevel};
