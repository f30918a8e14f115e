//! Display data for templates.
//!
//! Templates only read plain fields; everything that needs the category list
//! (links) or formatting is resolved here.

use bazaar_core::account::{Address, Card};
use bazaar_core::cart::{Cart, CartItem, Favorites};
use bazaar_core::catalog::{Category, Gender, Product, product_path};
use bazaar_core::{AddressId, CardId, Price, ProductId};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::CurrentUser;
use crate::services::flash::{self, Flash};
use crate::services::visitor;
use crate::state::AppState;

/// A product tile in listings.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub href: String,
    pub image: Option<String>,
    pub price: Price,
    pub rating: String,
    pub in_stock: bool,
    pub is_favorite: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, categories: &[Category], favorites: &Favorites) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            href: product_path(categories, product),
            image: product.primary_image().map(String::from),
            price: product.price,
            rating: format!("{:.1}", product.rating),
            in_stock: product.in_stock(),
            is_favorite: favorites.contains(product.id),
        }
    }
}

/// A cart line, in the header dropdown and on the cart page.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: ProductId,
    pub name: String,
    pub href: String,
    pub image: Option<String>,
    pub price: Price,
    pub count: u32,
    pub line_total: Price,
    pub checked: bool,
}

impl CartLine {
    #[must_use]
    pub fn new(item: &CartItem, categories: &[Category]) -> Self {
        Self {
            id: item.product.id,
            name: item.product.name.clone(),
            href: product_path(categories, &item.product),
            image: item.product.primary_image().map(String::from),
            price: item.product.price,
            count: item.count,
            line_total: item.line_total(),
            checked: item.checked,
        }
    }

    #[must_use]
    pub fn lines(cart: &Cart, categories: &[Category]) -> Vec<Self> {
        cart.items()
            .iter()
            .map(|item| Self::new(item, categories))
            .collect()
    }
}

/// A favorites entry.
#[derive(Debug, Clone)]
pub struct FavoriteLine {
    pub id: ProductId,
    pub name: String,
    pub href: String,
    pub image: Option<String>,
    pub price: Price,
}

impl FavoriteLine {
    #[must_use]
    pub fn lines(favorites: &Favorites, categories: &[Category]) -> Vec<Self> {
        favorites
            .items()
            .iter()
            .map(|product| Self {
                id: product.id,
                name: product.name.clone(),
                href: product_path(categories, product),
                image: product.primary_image().map(String::from),
                price: product.price,
            })
            .collect()
    }
}

/// A link in the shop menu.
#[derive(Debug, Clone)]
pub struct NavLink {
    pub title: String,
    pub href: String,
}

/// Categories of one audience in the shop menu.
#[derive(Debug, Clone)]
pub struct NavGroup {
    pub label: &'static str,
    pub links: Vec<NavLink>,
}

impl NavGroup {
    #[must_use]
    pub fn build(categories: &[Category]) -> Vec<Self> {
        [Gender::Women, Gender::Men]
            .into_iter()
            .map(|gender| Self {
                label: gender.label(),
                links: categories
                    .iter()
                    .filter(|c| c.gender == gender)
                    .map(|c| NavLink {
                        title: c.title.clone(),
                        href: c.path(),
                    })
                    .collect(),
            })
            .filter(|group| !group.links.is_empty())
            .collect()
    }
}

/// A saved address as a radio option.
#[derive(Debug, Clone)]
pub struct AddressOption {
    pub id: AddressId,
    pub title: String,
    pub recipient: String,
    pub phone: String,
    pub street: String,
    pub locality: String,
    pub selected: bool,
}

impl AddressOption {
    #[must_use]
    pub fn new(address: &Address, selected: Option<AddressId>) -> Self {
        Self {
            id: address.id,
            title: address.title.clone(),
            recipient: address.recipient(),
            phone: address.phone.clone(),
            street: address.address.clone(),
            locality: address.locality(),
            selected: selected == Some(address.id),
        }
    }
}

/// A saved card as a radio option.
#[derive(Debug, Clone)]
pub struct CardOption {
    pub id: CardId,
    pub masked_number: String,
    /// `MM/YYYY • Name On Card`
    pub caption: String,
    pub selected: bool,
}

impl CardOption {
    #[must_use]
    pub fn new(card: &Card, selected: Option<CardId>) -> Self {
        Self {
            id: card.id,
            masked_number: card.masked_number(),
            caption: format!("{} \u{2022} {}", card.expiry(), card.name_on_card),
            selected: selected == Some(card.id),
        }
    }
}

/// Everything the page chrome shows: header dropdowns, menu, flashes.
#[derive(Debug, Clone)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub cart_lines: Vec<CartLine>,
    pub cart_count: u32,
    pub cart_total: Price,
    pub favorites: Vec<FavoriteLine>,
    pub nav: Vec<NavGroup>,
    pub flashes: Vec<Flash>,
}

impl Layout {
    /// Load the chrome for the current visitor, taking pending flashes.
    ///
    /// A catalog outage only empties the menu; the page still renders.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(state: &AppState, session: &Session) -> Result<Self, AppError> {
        let categories = categories_or_empty(state).await;
        let user = visitor::refresh_user(state, session).await?;
        let cart = visitor::cart(session).await?;
        let favorites = visitor::favorites(session).await?;

        Ok(Self {
            user,
            cart_lines: CartLine::lines(&cart, &categories),
            cart_count: cart.total_count(),
            cart_total: cart.total_price(),
            favorites: FavoriteLine::lines(&favorites, &categories),
            nav: NavGroup::build(&categories),
            flashes: flash::take(session).await,
        })
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Name shown in the header.
    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.name.as_str())
    }

    #[must_use]
    pub fn favorites_count(&self) -> usize {
        self.favorites.len()
    }

    /// Show a message on the page being rendered now.
    pub fn flash(&mut self, flash: Flash) {
        self.flashes.push(flash);
    }
}

/// Categories for menus and links; an outage yields none.
pub async fn categories_or_empty(state: &AppState) -> Vec<Category> {
    match state.api().categories().await {
        Ok(categories) => categories,
        Err(e) => {
            tracing::warn!("Failed to load categories: {e}");
            Vec::new()
        }
    }
}
