//! The two-step checkout wizard: address selection, then payment.
//!
//! The address step produces [`CheckoutAddresses`] which, together with a
//! snapshot of the selected cart lines, becomes an [`OrderDraft`]. The payment
//! step combines the draft with a saved card and a freshly entered CVV into a
//! [`PaymentAttempt`].

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::{Address, Card};
use crate::cart::{Cart, CartItem};
use crate::pricing::{OrderSummary, ShippingPolicy};
use crate::types::{AddressId, CardId};

/// Reasons a checkout step cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Select items to checkout")]
    EmptySelection,
    #[error("Please select a shipping address.")]
    MissingShippingAddress,
    #[error("Please select a billing address.")]
    MissingBillingAddress,
    #[error("The selected address is no longer available.")]
    UnknownAddress,
    #[error("Please select a card.")]
    MissingCard,
    #[error("The selected card is no longer available.")]
    UnknownCard,
    #[error("Enter 3-digit CVV")]
    InvalidCvv,
}

/// Shipping and billing address chosen on the address step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutAddresses {
    pub shipping_id: AddressId,
    pub billing_id: AddressId,
}

/// State of the address picker.
///
/// While `same_as_shipping` is on, every shipping choice is mirrored into the
/// billing choice and the billing picker is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSelection {
    shipping_id: Option<AddressId>,
    billing_id: Option<AddressId>,
    same_as_shipping: bool,
}

impl Default for AddressSelection {
    fn default() -> Self {
        Self {
            shipping_id: None,
            billing_id: None,
            same_as_shipping: true,
        }
    }
}

impl AddressSelection {
    #[must_use]
    pub const fn shipping_id(&self) -> Option<AddressId> {
        self.shipping_id
    }

    #[must_use]
    pub const fn billing_id(&self) -> Option<AddressId> {
        self.billing_id
    }

    #[must_use]
    pub const fn same_as_shipping(&self) -> bool {
        self.same_as_shipping
    }

    /// Whether the billing picker should be rendered.
    #[must_use]
    pub const fn shows_billing_picker(&self) -> bool {
        !self.same_as_shipping
    }

    pub const fn select_shipping(&mut self, id: AddressId) {
        self.shipping_id = Some(id);
        if self.same_as_shipping {
            self.billing_id = Some(id);
        }
    }

    pub const fn select_billing(&mut self, id: AddressId) {
        self.billing_id = Some(id);
    }

    pub const fn set_same_as_shipping(&mut self, same: bool) {
        self.same_as_shipping = same;
        if same && self.shipping_id.is_some() {
            self.billing_id = self.shipping_id;
        }
    }

    /// Gate of the "Save & Continue" button.
    #[must_use]
    pub const fn can_continue(&self) -> bool {
        self.shipping_id.is_some() && (self.same_as_shipping || self.billing_id.is_some())
    }

    /// Forget choices that are not among `addresses`, e.g. after an address
    /// was deleted in another tab.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::UnknownAddress`] if a choice was dropped.
    pub fn retain_known(&mut self, addresses: &[Address]) -> Result<(), CheckoutError> {
        let before = (self.shipping_id, self.billing_id);
        let known = |id: Option<AddressId>| id.filter(|id| addresses.iter().any(|a| a.id == *id));
        self.shipping_id = known(self.shipping_id);
        self.billing_id = known(self.billing_id);

        if (self.shipping_id, self.billing_id) == before {
            Ok(())
        } else {
            Err(CheckoutError::UnknownAddress)
        }
    }

    /// Final addresses for the order.
    ///
    /// # Errors
    ///
    /// Returns an error if a required address is missing.
    pub fn resolve(&self) -> Result<CheckoutAddresses, CheckoutError> {
        let shipping_id = self
            .shipping_id
            .ok_or(CheckoutError::MissingShippingAddress)?;
        let billing_id = if self.same_as_shipping {
            shipping_id
        } else {
            self.billing_id.ok_or(CheckoutError::MissingBillingAddress)?
        };
        Ok(CheckoutAddresses {
            shipping_id,
            billing_id,
        })
    }
}

/// Checkout state accumulated between the address and payment steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub addresses: CheckoutAddresses,
    pub items: Vec<CartItem>,
    pub summary: OrderSummary,
}

impl OrderDraft {
    /// Snapshot the selected lines of `cart` and their totals.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptySelection`] if no line is selected.
    pub fn build(
        addresses: CheckoutAddresses,
        cart: &Cart,
        policy: &ShippingPolicy,
    ) -> Result<Self, CheckoutError> {
        let items: Vec<CartItem> = cart.selected().cloned().collect();
        if items.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }
        Ok(Self {
            addresses,
            items,
            summary: policy.summarize(cart),
        })
    }

    /// Number of units in the draft.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.count).sum()
    }
}

/// A validated pay request: a saved card and its security code.
///
/// The CVV is never stored; the attempt lives only as long as the request.
#[derive(Debug)]
pub struct PaymentAttempt {
    card_id: CardId,
    cvv: SecretString,
}

impl PaymentAttempt {
    /// Length of a card security code.
    pub const CVV_LENGTH: usize = 3;

    /// Validate the payment form. Non-digits are dropped from `cvv_input` and
    /// only the first three digits are kept, as the input field does.
    ///
    /// # Errors
    ///
    /// Returns an error if no card is selected or the CVV is not 3 digits.
    pub fn new(card_id: Option<CardId>, cvv_input: &str) -> Result<Self, CheckoutError> {
        let card_id = card_id.ok_or(CheckoutError::MissingCard)?;
        let cvv: String = cvv_input
            .chars()
            .filter(char::is_ascii_digit)
            .take(Self::CVV_LENGTH)
            .collect();
        if cvv.len() != Self::CVV_LENGTH {
            return Err(CheckoutError::InvalidCvv);
        }
        Ok(Self {
            card_id,
            cvv: SecretString::from(cvv),
        })
    }

    #[must_use]
    pub const fn card_id(&self) -> CardId {
        self.card_id
    }

    #[must_use]
    pub fn cvv(&self) -> &str {
        self.cvv.expose_secret()
    }

    /// Find the selected card among the saved ones.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::UnknownCard`] if it is not there.
    pub fn card<'a>(&self, cards: &'a [Card]) -> Result<&'a Card, CheckoutError> {
        cards
            .iter()
            .find(|c| c.id == self.card_id)
            .ok_or(CheckoutError::UnknownCard)
    }
}
