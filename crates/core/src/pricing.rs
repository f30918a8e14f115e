//! Shipping policy and order summary arithmetic.
//!
//! A flat shipping fee applies as soon as one cart line is selected. Once the
//! selected subtotal reaches the free-shipping threshold a discount equal to
//! the fee is granted, so the net shipping charge drops to zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::types::Price;

/// Flat shipping fee and the subtotal that waives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub base_fee: Price,
    pub free_threshold: Price,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            base_fee: Price::from_cents(2999),
            free_threshold: Price::new(Decimal::new(150, 0)),
        }
    }
}

impl ShippingPolicy {
    /// Summarize the selected lines of `cart`.
    #[must_use]
    pub fn summarize(&self, cart: &Cart) -> OrderSummary {
        self.summarize_subtotal(cart.selected_subtotal(), cart.has_selection())
    }

    /// Summarize an explicit subtotal. `has_selection` decides whether the
    /// base fee applies at all.
    #[must_use]
    pub fn summarize_subtotal(&self, subtotal: Price, has_selection: bool) -> OrderSummary {
        let shipping_base = if has_selection {
            self.base_fee
        } else {
            Price::ZERO
        };
        let discount = if subtotal >= self.free_threshold {
            self.base_fee
        } else {
            Price::ZERO
        };
        let shipping = shipping_base.saturating_sub(discount);

        OrderSummary {
            subtotal,
            shipping_base,
            discount,
            shipping,
            total: subtotal + shipping,
            free_threshold: self.free_threshold,
        }
    }
}

/// Derived totals shown next to the cart and carried through checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Selected lines only.
    pub subtotal: Price,
    /// Fee before discount; zero with an empty selection.
    pub shipping_base: Price,
    /// Shipping discount; either zero or the full base fee.
    pub discount: Price,
    /// Net shipping actually charged.
    pub shipping: Price,
    pub total: Price,
    free_threshold: Price,
}

impl OrderSummary {
    #[must_use]
    pub const fn has_discount(&self) -> bool {
        !self.discount.is_zero()
    }

    #[must_use]
    pub const fn is_free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }

    /// How much more the visitor has to select to get free shipping.
    ///
    /// `None` once the discount applies or while nothing is selected.
    #[must_use]
    pub fn amount_to_free_shipping(&self) -> Option<Price> {
        if self.has_discount() || self.subtotal.is_zero() {
            return None;
        }
        Some(self.free_threshold.saturating_sub(self.subtotal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::product;
    use crate::types::ProductId;

    #[test]
    fn test_empty_selection_charges_nothing() {
        let policy = ShippingPolicy::default();
        let mut cart = Cart::new();
        cart.add(product(1, 5000));
        cart.toggle_checked(ProductId::new(1));

        let summary = policy.summarize(&cart);
        assert_eq!(summary.subtotal, Price::ZERO);
        assert_eq!(summary.shipping_base, Price::ZERO);
        assert_eq!(summary.shipping, Price::ZERO);
        assert_eq!(summary.total, Price::ZERO);
        assert_eq!(summary.amount_to_free_shipping(), None);
    }

    #[test]
    fn test_below_threshold_pays_base_fee() {
        let policy = ShippingPolicy::default();
        let mut cart = Cart::new();
        cart.add_many(product(1, 4000), 2);

        let summary = policy.summarize(&cart);
        assert_eq!(summary.subtotal, Price::from_cents(8000));
        assert_eq!(summary.shipping, Price::from_cents(2999));
        assert!(!summary.has_discount());
        assert_eq!(summary.total, Price::from_cents(10_999));
        assert_eq!(
            summary.amount_to_free_shipping(),
            Some(Price::from_cents(7000))
        );
    }

    #[test]
    fn test_threshold_reached_makes_shipping_free() {
        let policy = ShippingPolicy::default();
        for cents in [15_000, 15_001, 99_999] {
            let summary = policy.summarize_subtotal(Price::from_cents(cents), true);
            assert_eq!(summary.discount, policy.base_fee);
            assert_eq!(summary.shipping, Price::ZERO);
            assert!(summary.is_free_shipping());
            assert_eq!(summary.total, Price::from_cents(cents));
            assert_eq!(summary.amount_to_free_shipping(), None);
        }
    }

    #[test]
    fn test_just_below_threshold() {
        let summary = ShippingPolicy::default().summarize_subtotal(Price::from_cents(14_999), true);
        assert_eq!(summary.shipping, Price::from_cents(2999));
        assert_eq!(summary.amount_to_free_shipping(), Some(Price::from_cents(1)));
    }

    #[test]
    fn test_custom_policy() {
        let policy = ShippingPolicy {
            base_fee: Price::from_cents(500),
            free_threshold: Price::from_cents(2000),
        };
        let summary = policy.summarize_subtotal(Price::from_cents(2000), true);
        assert_eq!(summary.discount, Price::from_cents(500));
        assert_eq!(summary.total, Price::from_cents(2000));
    }
}
