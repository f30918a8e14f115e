//! Bazaar Core - storefront domain library.
//!
//! This crate holds the rules the storefront enforces on top of the backend
//! REST API:
//! - `storefront` - Server-rendered shop, cart and checkout
//! - `integration-tests` - End-to-end tests against a mock backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session access. Handlers load state, call into this crate, and
//! persist the result.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and emails
//! - [`catalog`] - Products, categories, slugs and listing queries
//! - [`account`] - Users, roles, saved addresses and cards
//! - [`cart`] - Session cart and favorites
//! - [`pricing`] - Shipping policy and order summaries
//! - [`checkout`] - Address and payment steps of the checkout wizard
//! - [`validation`] - Form validation with inline field errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod pricing;
pub mod types;
pub mod validation;

pub use types::*;
