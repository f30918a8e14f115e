//! Session cart and favorites list.
//!
//! Both live in the visitor's session and hold product snapshots taken when
//! the product was added, so rendering them never needs a catalog request.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// One cart line.
///
/// Invariant: `count >= 1`. A line whose count would drop to zero is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub count: u32,
    /// Whether the line takes part in checkout totals.
    pub checked: bool,
}

impl CartItem {
    /// Unit price times count.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.count)
    }
}

/// The visitor's shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.id == id)
    }

    fn get_mut(&mut self, id: ProductId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| item.product.id == id)
    }

    /// Add one unit of `product`. New lines start checked.
    pub fn add(&mut self, product: Product) {
        self.add_many(product, 1);
    }

    /// Add `quantity` units of `product`; a quantity of zero is a no-op.
    ///
    /// The stored snapshot is refreshed so that the latest price is used.
    pub fn add_many(&mut self, product: Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.get_mut(product.id) {
            Some(item) => {
                item.count = item.count.saturating_add(quantity);
                item.product = product;
            }
            None => self.items.push(CartItem {
                product,
                count: quantity,
                checked: true,
            }),
        }
    }

    /// Add one unit to an existing line. Returns `false` if the line is absent.
    pub fn increase(&mut self, id: ProductId) -> bool {
        self.get_mut(id).is_some_and(|item| {
            item.count = item.count.saturating_add(1);
            true
        })
    }

    /// Remove one unit; the line disappears when its count reaches zero.
    /// Returns `false` if the line is absent.
    pub fn decrease(&mut self, id: ProductId) -> bool {
        let Some(pos) = self.items.iter().position(|item| item.product.id == id) else {
            return false;
        };
        let remove = self.items.get_mut(pos).is_some_and(|item| {
            item.count = item.count.saturating_sub(1);
            item.count == 0
        });
        if remove {
            self.items.remove(pos);
        }
        true
    }

    /// Remove a line entirely. Returns `false` if the line is absent.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != id);
        self.items.len() != before
    }

    /// Flip the checkout flag of a line. Returns `false` if the line is absent.
    pub fn toggle_checked(&mut self, id: ProductId) -> bool {
        self.get_mut(id).is_some_and(|item| {
            item.checked = !item.checked;
            true
        })
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.items.iter().map(|item| item.count).sum()
    }

    /// Price of every line, checked or not.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Lines marked for checkout.
    pub fn selected(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|item| item.checked)
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.items.iter().any(|item| item.checked)
    }

    /// Price of the lines marked for checkout.
    #[must_use]
    pub fn selected_subtotal(&self) -> Price {
        self.selected().map(CartItem::line_total).sum()
    }

    /// Remove the lines that were part of a placed order.
    pub fn remove_ordered(&mut self, ordered: &[CartItem]) {
        self.items
            .retain(|item| !ordered.iter().any(|o| o.product.id == item.product.id));
    }
}

/// The visitor's favorites, unique by product id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Favorites {
    items: Vec<Product>,
}

impl Favorites {
    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.items.iter().any(|p| p.id == id)
    }

    /// Add `product` unless it is already a favorite.
    pub fn add(&mut self, product: Product) {
        if !self.contains(product.id) {
            self.items.push(product);
        }
    }

    /// Returns `false` if the product was not a favorite.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|p| p.id != id);
        self.items.len() != before
    }

    /// Add or remove; returns whether the product is a favorite afterwards.
    pub fn toggle(&mut self, product: Product) -> bool {
        if self.remove(product.id) {
            false
        } else {
            self.items.push(product);
            true
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::ProductImage;

    pub(crate) fn product(id: i64, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: "A product".to_string(),
            price: Price::from_cents(cents),
            stock: 10,
            store_id: None,
            category_id: None,
            rating: 4.0,
            sell_count: 0,
            images: vec![ProductImage {
                url: format!("https://img/{id}.jpg"),
                index: 0,
            }],
        }
    }

    #[test]
    fn test_add_inserts_checked_line_then_increments() {
        let mut cart = Cart::new();
        cart.add(product(1, 1000));
        cart.add(product(1, 1000));
        cart.add(product(2, 500));

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.get(ProductId::new(1)).map(|i| i.count), Some(2));
        assert!(cart.items().iter().all(|i| i.checked));
        assert_eq!(cart.total_count(), 3);
    }

    #[test]
    fn test_add_many_zero_is_noop() {
        let mut cart = Cart::new();
        cart.add_many(product(1, 1000), 0);
        assert!(cart.is_empty());
        cart.add_many(product(1, 1000), 3);
        assert_eq!(cart.total_count(), 3);
    }

    #[test]
    fn test_decrease_to_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add_many(product(1, 1000), 2);

        assert!(cart.decrease(ProductId::new(1)));
        assert_eq!(cart.get(ProductId::new(1)).map(|i| i.count), Some(1));

        assert!(cart.decrease(ProductId::new(1)));
        assert!(cart.get(ProductId::new(1)).is_none());
        assert!(!cart.decrease(ProductId::new(1)));
    }

    #[test]
    fn test_remove_and_increase() {
        let mut cart = Cart::new();
        cart.add(product(1, 1000));
        assert!(cart.increase(ProductId::new(1)));
        assert_eq!(cart.total_count(), 2);
        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
        assert!(!cart.increase(ProductId::new(1)));
    }

    #[test]
    fn test_totals_distinguish_selected_lines() {
        let mut cart = Cart::new();
        cart.add_many(product(1, 1000), 2);
        cart.add(product(2, 2550));
        cart.toggle_checked(ProductId::new(2));

        assert_eq!(cart.total_price(), Price::from_cents(4550));
        assert_eq!(cart.selected_subtotal(), Price::from_cents(2000));
        assert_eq!(cart.selected().count(), 1);

        cart.toggle_checked(ProductId::new(1));
        assert!(!cart.has_selection());
        assert_eq!(cart.selected_subtotal(), Price::ZERO);
    }

    #[test]
    fn test_remove_ordered_keeps_unselected_lines() {
        let mut cart = Cart::new();
        cart.add(product(1, 1000));
        cart.add(product(2, 1000));
        cart.toggle_checked(ProductId::new(2));

        let ordered: Vec<CartItem> = cart.selected().cloned().collect();
        cart.remove_ordered(&ordered);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items().first().map(|i| i.product.id), Some(ProductId::new(2)));
    }

    #[test]
    fn test_favorites_are_unique_and_toggle() {
        let mut favorites = Favorites::default();
        favorites.add(product(1, 100));
        favorites.add(product(1, 100));
        assert_eq!(favorites.len(), 1);

        assert!(!favorites.toggle(product(1, 100)));
        assert!(favorites.is_empty());
        assert!(favorites.toggle(product(2, 100)));
        assert!(favorites.contains(ProductId::new(2)));
        assert!(favorites.remove(ProductId::new(2)));
        assert!(!favorites.remove(ProductId::new(2)));
    }
}
