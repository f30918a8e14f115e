//! Request and response bodies of the backend API.
//!
//! Domain records (products, categories, addresses, cards, roles) are shared
//! with `bazaar-core`; only the envelopes live here.

use bazaar_core::account::Card;
use bazaar_core::cart::CartItem;
use bazaar_core::checkout::{OrderDraft, PaymentAttempt};
use bazaar_core::validation::{Registration, StoreDetails};
use bazaar_core::{AddressId, ProductId, RoleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error body: `{"message": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

/// `POST /login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Answer of `POST /login` and `GET /verify`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedUser {
    /// Empty when `GET /verify` does not reissue the token.
    #[serde(default)]
    pub token: String,
    pub name: String,
    pub email: String,
    pub role_id: RoleId,
}

/// `POST /signup`. `store` is only sent for the store role.
#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role_id: RoleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<&'a StoreDetails>,
}

impl<'a> From<&'a Registration> for SignupRequest<'a> {
    fn from(registration: &'a Registration) -> Self {
        Self {
            name: &registration.name,
            email: registration.email.as_str(),
            password: registration.password(),
            role_id: registration.role_id,
            store: registration.store.as_ref(),
        }
    }
}

/// One line of `POST /order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub count: u32,
    pub detail: String,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id,
            count: item.count,
            detail: item.product.name.clone(),
        }
    }
}

/// `POST /order`.
///
/// Carries the card security code, so it is built right before sending and
/// dropped with the request.
#[derive(Serialize)]
pub struct OrderRequest {
    pub address_id: AddressId,
    pub order_date: String,
    pub card_no: String,
    pub card_name: String,
    pub card_expire_month: u32,
    pub card_expire_year: i32,
    pub card_ccv: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub products: Vec<OrderLine>,
}

impl OrderRequest {
    /// Assemble the order from the checkout draft and the pay form.
    #[must_use]
    pub fn new(
        draft: &OrderDraft,
        card: &Card,
        payment: &PaymentAttempt,
        order_date: chrono::NaiveDateTime,
    ) -> Self {
        Self {
            address_id: draft.addresses.shipping_id,
            order_date: order_date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            card_no: card.card_no.clone(),
            card_name: card.name_on_card.clone(),
            card_expire_month: card.expire_month,
            card_expire_year: card.expire_year,
            card_ccv: payment.cvv().to_string(),
            price: draft.summary.total.amount(),
            products: draft.items.iter().map(OrderLine::from).collect(),
        }
    }
}

impl std::fmt::Debug for OrderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderRequest")
            .field("address_id", &self.address_id)
            .field("order_date", &self.order_date)
            .field("card_no", &bazaar_core::account::mask_card_number(&self.card_no))
            .field("card_ccv", &"[REDACTED]")
            .field("price", &self.price)
            .field("products", &self.products)
            .finish_non_exhaustive()
    }
}

/// Answer of `POST /order`. Backends differ in what they echo back, so
/// every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderCreated {
    #[serde(default)]
    pub id: Option<bazaar_core::OrderId>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::account::Card;
    use bazaar_core::cart::Cart;
    use bazaar_core::catalog::Product;
    use bazaar_core::checkout::CheckoutAddresses;
    use bazaar_core::pricing::ShippingPolicy;
    use bazaar_core::{CardId, Price};
    use chrono::NaiveDate;

    use super::*;

    fn product(id: i64, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Price::from_cents(cents),
            stock: 10,
            store_id: None,
            category_id: None,
            rating: 4.5,
            sell_count: 0,
            images: Vec::new(),
        }
    }

    #[test]
    fn test_order_request_body() {
        let mut cart = Cart::new();
        cart.add_many(product(1, 5_000), 2);
        cart.add(product(2, 1_000));
        let addresses = CheckoutAddresses {
            shipping_id: AddressId::new(4),
            billing_id: AddressId::new(5),
        };
        let draft = OrderDraft::build(addresses, &cart, &ShippingPolicy::default()).unwrap();
        let card = Card {
            id: CardId::new(9),
            card_no: "4111111111111111".to_string(),
            expire_month: 12,
            expire_year: 2030,
            name_on_card: "Ada Lovelace".to_string(),
        };
        let payment = PaymentAttempt::new(Some(card.id), "123").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();

        let request = OrderRequest::new(&draft, &card, &payment, date);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["address_id"], 4);
        assert_eq!(json["order_date"], "2026-10-19T14:30:00");
        assert_eq!(json["card_ccv"], "123");
        assert_eq!(json["card_expire_month"], 12);
        assert_eq!(json["price"], 139.99);
        assert_eq!(json["products"][0]["product_id"], 1);
        assert_eq!(json["products"][0]["count"], 2);
        assert_eq!(json["products"][1]["detail"], "Product 2");

        let debug = format!("{request:?}");
        assert!(!debug.contains("\"123\""));
        assert!(!debug.contains("4111111111111111"));
    }

    #[test]
    fn test_signup_omits_store_for_customers() {
        let registration = Registration {
            name: "Ada".to_string(),
            email: bazaar_core::Email::parse("ada@example.com").unwrap(),
            password: secrecy::SecretString::from("Secret1!"),
            role_id: RoleId::new(3),
            store: None,
        };
        let json = serde_json::to_value(SignupRequest::from(&registration)).unwrap();
        assert_eq!(json["password"], "Secret1!");
        assert_eq!(json["role_id"], 3);
        assert!(json.get("store").is_none());
    }
}
