//! Form validation for login, registration, saved cards and addresses.
//!
//! Each form is deserialized from the raw `application/x-www-form-urlencoded`
//! body and validated into a typed request. Failures are collected per field
//! so the page can show every message next to its input at once.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::account::{Role, STORE_ROLE_CODE, role_id_by_code};
use crate::types::{Email, RoleId};

static STORE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{7,11}$").expect("Invalid regex"));
static TAX_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^T\d{4}V\d{6}$").expect("Invalid regex"));
static IBAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TR\d{24}$").expect("Invalid regex"));
static ADDRESS_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ]{8,16}[0-9]$").expect("Invalid regex"));

/// Minimum length of names, store names and names on cards.
pub const MIN_NAME_LENGTH: usize = 3;
/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// How many years ahead a card expiry may lie.
pub const MAX_CARD_YEARS_AHEAD: i32 = 20;

/// Validation messages keyed by form field name, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(Vec<(String, String)>);

impl FieldErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a message for `field`. Only the first message per field is kept.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field.to_string(), message.into()));
        }
    }

    /// Message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, message)| message.as_str())
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

fn required<'a>(errors: &mut FieldErrors, field: &str, value: &'a str, message: &str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, message);
    }
    value
}

fn min_chars(errors: &mut FieldErrors, field: &str, value: &str, min: usize, message: &str) {
    if !value.is_empty() && value.chars().count() < min {
        errors.add(field, message);
    }
}

fn matches(errors: &mut FieldErrors, field: &str, value: &str, re: &Regex, message: &str) {
    if !value.is_empty() && !re.is_match(value) {
        errors.add(field, message);
    }
}

fn email(errors: &mut FieldErrors, value: &str) -> Option<Email> {
    Email::parse(value)
        .map_err(|e| errors.add("email", e.to_string()))
        .ok()
}

/// Whether `password` mixes lowercase, uppercase, digits and a special
/// character.
#[must_use]
pub fn is_strong_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric())
}

// =============================================================================
// Login
// =============================================================================

/// Raw login form.
#[derive(Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Checkbox; present only when ticked.
    #[serde(default)]
    pub remember: Option<String>,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("remember", &self.remember)
            .finish()
    }
}

/// Validated login request.
#[derive(Debug)]
pub struct LoginCredentials {
    pub email: Email,
    pub password: SecretString,
    pub remember: bool,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns the per-field messages if the form is invalid.
    pub fn validate(&self) -> Result<LoginCredentials, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        match email {
            Some(email) if errors.is_empty() => Ok(LoginCredentials {
                email,
                password: SecretString::from(self.password.clone()),
                remember: self.remember.is_some(),
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Raw registration form. Store fields are only read for the store role.
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    #[serde(default)]
    pub role_id: String,
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub store_phone: String,
    #[serde(default)]
    pub tax_no: String,
    #[serde(default)]
    pub bank_account: String,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role_id", &self.role_id)
            .field("store_name", &self.store_name)
            .finish_non_exhaustive()
    }
}

/// Shop details sent along with a store-role signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreDetails {
    pub name: String,
    pub phone: String,
    pub tax_no: String,
    pub bank_account: String,
}

/// Validated signup request.
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
    pub role_id: RoleId,
    pub store: Option<StoreDetails>,
}

impl RegistrationForm {
    /// Empty form with the customer role preselected.
    #[must_use]
    pub fn with_default_role(roles: &[Role]) -> Self {
        Self {
            role_id: role_id_by_code(roles, crate::account::CUSTOMER_ROLE_CODE)
                .map(|id| id.to_string())
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Copy of the form to re-render, with both password fields blanked.
    #[must_use]
    pub fn without_passwords(&self) -> Self {
        Self {
            password: String::new(),
            password_confirm: String::new(),
            ..self.clone()
        }
    }

    /// Selected role, if the field holds an id.
    #[must_use]
    pub fn selected_role(&self) -> Option<RoleId> {
        self.role_id.parse().ok()
    }

    /// Whether the store fields apply to the selected role.
    #[must_use]
    pub fn is_store_role(&self, roles: &[Role]) -> bool {
        let store = role_id_by_code(roles, STORE_ROLE_CODE);
        store.is_some() && self.selected_role() == store
    }

    /// # Errors
    ///
    /// Returns the per-field messages if the form is invalid. A password
    /// mismatch is only reported once every other field is valid.
    pub fn validate(&self, roles: &[Role]) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required(&mut errors, "name", &self.name, "Name is required");
        min_chars(&mut errors, "name", name, MIN_NAME_LENGTH, "At least 3 characters");

        let email = email(&mut errors, &self.email);

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add("password", "At least 8 characters");
        } else if !is_strong_password(&self.password) {
            errors.add("password", "Must include upper, lower, number, and special char");
        }
        if self.password_confirm.is_empty() {
            errors.add("password_confirm", "Please confirm your password");
        }

        let role_id = self.selected_role();
        if role_id.is_none() {
            errors.add("role_id", "Role is required");
        }

        let store = self.is_store_role(roles).then(|| self.validate_store(&mut errors));

        if errors.is_empty() && self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match!");
        }

        match (email, role_id) {
            (Some(email), Some(role_id)) if errors.is_empty() => Ok(Registration {
                name: name.to_string(),
                email,
                password: SecretString::from(self.password.clone()),
                role_id,
                store,
            }),
            _ => Err(errors),
        }
    }

    fn validate_store(&self, errors: &mut FieldErrors) -> StoreDetails {
        let name = required(errors, "store_name", &self.store_name, "Store name is required");
        min_chars(errors, "store_name", name, MIN_NAME_LENGTH, "At least 3 characters");

        let phone = required(errors, "store_phone", &self.store_phone, "Phone is required");
        matches(errors, "store_phone", phone, &STORE_PHONE_RE, "Invalid mobile number");

        let tax_no = required(errors, "tax_no", &self.tax_no, "Tax ID is required");
        matches(errors, "tax_no", tax_no, &TAX_NO_RE, "Format TXXXXVXXXXXX");

        let bank_account = required(
            errors,
            "bank_account",
            &self.bank_account,
            "Bank account is required",
        );
        matches(errors, "bank_account", bank_account, &IBAN_RE, "Invalid IBAN");

        StoreDetails {
            name: name.to_string(),
            phone: phone.to_string(),
            tax_no: tax_no.to_string(),
            bank_account: bank_account.to_string(),
        }
    }
}

impl Registration {
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

// =============================================================================
// Saved cards
// =============================================================================

/// Raw "add card" form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCardForm {
    #[serde(default)]
    pub card_no: String,
    #[serde(default)]
    pub expire_month: String,
    #[serde(default)]
    pub expire_year: String,
    #[serde(default)]
    pub name_on_card: String,
}

/// Validated card ready for `POST /user/card`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCard {
    pub card_no: String,
    pub expire_month: u32,
    pub expire_year: i32,
    pub name_on_card: String,
}

impl NewCardForm {
    /// Validate against `current_year`, which bounds the expiry year.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages if the form is invalid.
    pub fn validate(&self, current_year: i32) -> Result<NewCard, FieldErrors> {
        let mut errors = FieldErrors::new();

        let card_no: String = self.card_no.split_whitespace().collect();
        if card_no.is_empty() {
            errors.add("card_no", "Required");
        } else if card_no.len() != 16 || !card_no.bytes().all(|b| b.is_ascii_digit()) {
            errors.add("card_no", "Must be 16 digits");
        }

        let month = required(&mut errors, "expire_month", &self.expire_month, "Required");
        let expire_month = month.parse::<u32>().ok().filter(|m| (1..=12).contains(m));
        if !month.is_empty() && expire_month.is_none() {
            errors.add("expire_month", "1-12");
        }

        let year = required(&mut errors, "expire_year", &self.expire_year, "Required");
        let expire_year = year.parse::<i32>().ok();
        if !year.is_empty() {
            match expire_year {
                Some(y) if y > current_year + MAX_CARD_YEARS_AHEAD => {
                    errors.add("expire_year", "Too far");
                }
                Some(y) if y >= current_year => {}
                _ => errors.add("expire_year", "Invalid year"),
            }
        }

        let name_on_card = required(&mut errors, "name_on_card", &self.name_on_card, "Required");
        min_chars(
            &mut errors,
            "name_on_card",
            name_on_card,
            MIN_NAME_LENGTH,
            "At least 3 characters",
        );

        match (expire_month, expire_year) {
            (Some(expire_month), Some(expire_year)) if errors.is_empty() => Ok(NewCard {
                card_no,
                expire_month,
                expire_year,
                name_on_card: name_on_card.to_string(),
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Saved addresses
// =============================================================================

/// Raw "add address" form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAddressForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub address: String,
}

/// Validated address ready for `POST /user/address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAddress {
    pub title: String,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub city: String,
    pub district: String,
    pub neighborhood: String,
    pub address: String,
}

impl NewAddressForm {
    /// # Errors
    ///
    /// Returns the per-field messages if the form is invalid.
    pub fn validate(&self) -> Result<NewAddress, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut field = |name: &str, value: &str| required(&mut errors, name, value, "Required").to_string();

        let address = NewAddress {
            title: field("title", &self.title),
            name: field("name", &self.name),
            surname: field("surname", &self.surname),
            phone: field("phone", &self.phone),
            city: field("city", &self.city),
            district: field("district", &self.district),
            neighborhood: field("neighborhood", &self.neighborhood),
            address: field("address", &self.address),
        };
        matches(
            &mut errors,
            "phone",
            &address.phone,
            &ADDRESS_PHONE_RE,
            "Invalid phone number",
        );

        errors.into_result(|| address)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
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
                code: STORE_ROLE_CODE.to_string(),
                name: "Mağaza".to_string(),
            },
            Role {
                id: RoleId::new(3),
                code: crate::account::CUSTOMER_ROLE_CODE.to_string(),
                name: "Müşteri".to_string(),
            },
        ]
    }

    fn registration(role_id: &str) -> RegistrationForm {
        RegistrationForm {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "Secret1!".to_string(),
            password_confirm: "Secret1!".to_string(),
            role_id: role_id.to_string(),
            ..RegistrationForm::default()
        }
    }

    #[test]
    fn test_field_errors_keep_first_message_in_order() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Email is required");
        errors.add("password", "Password is required");
        errors.add("email", "Invalid email address");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert!(!errors.has("name"));
        let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, ["email", "password"]);
    }

    #[test]
    fn test_login_requires_email_and_password() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));

        let form = LoginForm {
            email: "not-an-email".to_string(),
            password: "x".to_string(),
            remember: None,
        };
        assert_eq!(
            form.validate().unwrap_err().get("email"),
            Some("Invalid email address")
        );
    }

    #[test]
    fn test_login_reads_remember_checkbox() {
        let form = LoginForm {
            email: " ada@example.com ".to_string(),
            password: "whatever".to_string(),
            remember: Some("on".to_string()),
        };
        let credentials = form.validate().unwrap();
        assert_eq!(credentials.email.as_str(), "ada@example.com");
        assert!(credentials.remember);
        assert_eq!(credentials.password.expose_secret(), "whatever");
    }

    #[test]
    fn test_password_strength() {
        assert!(is_strong_password("Secret1!"));
        assert!(is_strong_password("Secret_12"));
        assert!(!is_strong_password("secret1!"));
        assert!(!is_strong_password("SECRET1!"));
        assert!(!is_strong_password("Secret!!"));
        assert!(!is_strong_password("Secret12"));

        // Letter classes are ASCII; anything else counts as a special char.
        assert!(is_strong_password("Abcdefg1é"));
        assert!(!is_strong_password("àBCDEFG1!"));
    }

    #[test]
    fn test_registration_password_rules() {
        let cases = [
            ("", "Password is required"),
            ("Se1!", "At least 8 characters"),
            ("secret12!", "Must include upper, lower, number, and special char"),
            ("SECRET12!", "Must include upper, lower, number, and special char"),
            ("Secretss!", "Must include upper, lower, number, and special char"),
            ("Secret123", "Must include upper, lower, number, and special char"),
        ];
        for (password, message) in cases {
            let mut form = registration("3");
            form.password = password.to_string();
            form.password_confirm = password.to_string();
            let errors = form.validate(&roles()).unwrap_err();
            assert_eq!(errors.get("password"), Some(message), "password {password:?}");
        }
    }

    #[test]
    fn test_registration_customer_ignores_store_fields() {
        let mut form = registration("3");
        form.store_phone = "garbage".to_string();
        assert!(!form.is_store_role(&roles()));

        let registration = form.validate(&roles()).unwrap();
        assert_eq!(registration.role_id, RoleId::new(3));
        assert!(registration.store.is_none());
        assert_eq!(registration.password(), "Secret1!");
    }

    #[test]
    fn test_registration_store_requires_store_fields() {
        let form = registration("2");
        assert!(form.is_store_role(&roles()));

        let errors = form.validate(&roles()).unwrap_err();
        assert_eq!(errors.get("store_name"), Some("Store name is required"));
        assert_eq!(errors.get("store_phone"), Some("Phone is required"));
        assert_eq!(errors.get("tax_no"), Some("Tax ID is required"));
        assert_eq!(errors.get("bank_account"), Some("Bank account is required"));
    }

    #[test]
    fn test_registration_store_field_formats() {
        let mut form = registration("2");
        form.store_name = "AB".to_string();
        form.store_phone = "05551234567".to_string();
        form.tax_no = "T12V123456".to_string();
        form.bank_account = "DE00123".to_string();

        let errors = form.validate(&roles()).unwrap_err();
        assert_eq!(errors.get("store_name"), Some("At least 3 characters"));
        assert_eq!(errors.get("store_phone"), Some("Invalid mobile number"));
        assert_eq!(errors.get("tax_no"), Some("Format TXXXXVXXXXXX"));
        assert_eq!(errors.get("bank_account"), Some("Invalid IBAN"));

        form.store_name = "Ada's Shop".to_string();
        form.store_phone = "+905551234567".to_string();
        form.tax_no = "T1234V123456".to_string();
        form.bank_account = "TR123456789012345678901234".to_string();
        let store = form.validate(&roles()).unwrap().store.unwrap();
        assert_eq!(store.tax_no, "T1234V123456");
        assert_eq!(store.phone, "+905551234567");
    }

    #[test]
    fn test_registration_requires_role() {
        let errors = registration("").validate(&roles()).unwrap_err();
        assert_eq!(errors.get("role_id"), Some("Role is required"));
    }

    #[test]
    fn test_registration_mismatch_reported_last() {
        let mut form = registration("3");
        form.password_confirm = "Secret2!".to_string();
        let errors = form.validate(&roles()).unwrap_err();
        assert_eq!(errors.get("password_confirm"), Some("Passwords do not match!"));

        form.name = String::new();
        let errors = form.validate(&roles()).unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert!(!errors.has("password_confirm"));
    }

    #[test]
    fn test_forms_never_show_passwords() {
        let form = registration("3");
        assert!(!format!("{form:?}").contains("Secret1!"));
        let blank = form.without_passwords();
        assert!(blank.password.is_empty() && blank.password_confirm.is_empty());
        assert_eq!(blank.email, form.email);

        let login = LoginForm {
            email: "ada@example.com".to_string(),
            password: "Secret1!".to_string(),
            remember: None,
        };
        assert!(!format!("{login:?}").contains("Secret1!"));
    }

    #[test]
    fn test_registration_default_role_is_customer() {
        let form = RegistrationForm::with_default_role(&roles());
        assert_eq!(form.selected_role(), Some(RoleId::new(3)));
        assert_eq!(RegistrationForm::with_default_role(&[]).selected_role(), None);
    }

    #[test]
    fn test_new_card_validation() {
        let form = NewCardForm {
            card_no: "4111 1111 1111 1111".to_string(),
            expire_month: "7".to_string(),
            expire_year: "2030".to_string(),
            name_on_card: "Ada Lovelace".to_string(),
        };
        let card = form.validate(2026).unwrap();
        assert_eq!(card.card_no, "4111111111111111");
        assert_eq!(card.expire_month, 7);

        let errors = NewCardForm::default().validate(2026).unwrap_err();
        for field in ["card_no", "expire_month", "expire_year", "name_on_card"] {
            assert_eq!(errors.get(field), Some("Required"), "{field}");
        }
    }

    #[test]
    fn test_new_card_bounds() {
        let mut form = NewCardForm {
            card_no: "41111111".to_string(),
            expire_month: "13".to_string(),
            expire_year: "2025".to_string(),
            name_on_card: "Al".to_string(),
        };
        let errors = form.validate(2026).unwrap_err();
        assert_eq!(errors.get("card_no"), Some("Must be 16 digits"));
        assert_eq!(errors.get("expire_month"), Some("1-12"));
        assert_eq!(errors.get("expire_year"), Some("Invalid year"));
        assert_eq!(errors.get("name_on_card"), Some("At least 3 characters"));

        form.expire_year = "2047".to_string();
        assert_eq!(form.validate(2026).unwrap_err().get("expire_year"), Some("Too far"));
        form.expire_year = "2046".to_string();
        assert!(!form.validate(2026).unwrap_err().has("expire_year"));
    }

    #[test]
    fn test_new_address_validation() {
        let errors = NewAddressForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 8);

        let form = NewAddressForm {
            title: "Home".to_string(),
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            phone: "0555 123 45 67".to_string(),
            city: "İstanbul".to_string(),
            district: "Kadıköy".to_string(),
            neighborhood: "Moda".to_string(),
            address: "Street 1".to_string(),
        };
        assert_eq!(form.validate().unwrap().city, "İstanbul");

        let bad = NewAddressForm {
            phone: "call me".to_string(),
            ..form
        };
        assert_eq!(bad.validate().unwrap_err().get("phone"), Some("Invalid phone number"));
    }
}
