//! Account records owned by the backend: roles, saved addresses and cards.

use serde::{Deserialize, Serialize};

use crate::types::{AddressId, CardId, RoleId};

/// Role code of shop owners.
pub const STORE_ROLE_CODE: &str = "store";
/// Role code of regular shoppers, the registration default.
pub const CUSTOMER_ROLE_CODE: &str = "customer";

/// A user role as listed by `GET /roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl Role {
    /// Label shown in the registration role picker.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.code.as_str() {
            CUSTOMER_ROLE_CODE => "Customer",
            STORE_ROLE_CODE => "Store",
            _ => "Admin",
        }
    }

    #[must_use]
    pub fn is_store(&self) -> bool {
        self.code == STORE_ROLE_CODE
    }
}

/// Find the id of the role with `code`.
#[must_use]
pub fn role_id_by_code(roles: &[Role], code: &str) -> Option<RoleId> {
    roles.iter().find(|r| r.code == code).map(|r| r.id)
}

/// A saved address of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub title: String,
    pub name: String,
    pub surname: String,
    pub phone: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub district: String,
    pub city: String,
    pub address: String,
}

impl Address {
    /// "Name Surname".
    #[must_use]
    pub fn recipient(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }

    /// "Neighborhood, District/City".
    #[must_use]
    pub fn locality(&self) -> String {
        format!("{}, {}/{}", self.neighborhood, self.district, self.city)
    }
}

/// A saved payment card of the logged-in user.
///
/// The backend stores the full number; it is only ever shown masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub card_no: String,
    pub expire_month: u32,
    pub expire_year: i32,
    pub name_on_card: String,
}

impl Card {
    /// Card number with every digit that is followed by four more digits
    /// replaced by `*`.
    #[must_use]
    pub fn masked_number(&self) -> String {
        mask_card_number(&self.card_no)
    }

    /// Expiry rendered as `MM/YYYY`.
    #[must_use]
    pub fn expiry(&self) -> String {
        format!("{:02}/{}", self.expire_month, self.expire_year)
    }
}

/// Mask all but the trailing four digits of each digit run of `number`.
#[must_use]
pub fn mask_card_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let followed_by_four = chars
                .get(i + 1..i + 5)
                .is_some_and(|next| next.iter().all(char::is_ascii_digit));
            if c.is_ascii_digit() && followed_by_four {
                '*'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> Vec<Role> {
        vec![
            Role {
                id: RoleId::new(1),
                code: "admin".to_string(),
                name: "Yönetici".to_string(),
            },
            Role {
                id: RoleId::new(2),
                code: "store".to_string(),
                name: "Mağaza".to_string(),
            },
            Role {
                id: RoleId::new(3),
                code: "customer".to_string(),
                name: "Müşteri".to_string(),
            },
        ]
    }

    #[test]
    fn test_role_lookup_by_code() {
        let roles = roles();
        assert_eq!(role_id_by_code(&roles, STORE_ROLE_CODE), Some(RoleId::new(2)));
        assert_eq!(
            role_id_by_code(&roles, CUSTOMER_ROLE_CODE),
            Some(RoleId::new(3))
        );
        assert_eq!(role_id_by_code(&roles, "guest"), None);
    }

    #[test]
    fn test_role_labels() {
        let labels: Vec<_> = roles().iter().map(Role::label).collect();
        assert_eq!(labels, vec!["Admin", "Store", "Customer"]);
    }

    #[test]
    fn test_mask_card_number() {
        assert_eq!(mask_card_number("1234567812345678"), "************5678");
        assert_eq!(mask_card_number("1234"), "1234");
        assert_eq!(mask_card_number("1234 5678 9012 3456"), "1234 5678 9012 3456");
        assert_eq!(mask_card_number(""), "");
    }

    #[test]
    fn test_card_display_helpers() {
        let card = Card {
            id: CardId::new(1),
            card_no: "4111111111111111".to_string(),
            expire_month: 3,
            expire_year: 2030,
            name_on_card: "Ada Lovelace".to_string(),
        };
        assert_eq!(card.masked_number(), "************1111");
        assert_eq!(card.expiry(), "03/2030");
    }

    #[test]
    fn test_address_display_helpers() {
        let address = Address {
            id: AddressId::new(1),
            title: "Home".to_string(),
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            phone: "05551234567".to_string(),
            neighborhood: "Moda".to_string(),
            district: "Kadıköy".to_string(),
            city: "İstanbul".to_string(),
            address: "Street 1".to_string(),
        };
        assert_eq!(address.recipient(), "Ada Lovelace");
        assert_eq!(address.locality(), "Moda, Kadıköy/İstanbul");
    }
}
