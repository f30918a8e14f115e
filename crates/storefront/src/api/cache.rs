//! Cache types for catalog responses.

use bazaar_core::ProductId;
use bazaar_core::account::Role;
use bazaar_core::catalog::{Category, Product, ProductPage, ProductQuery};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Roles,
    Categories,
    Product(ProductId),
    Products(ProductQuery),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Roles(Vec<Role>),
    Categories(Vec<Category>),
    Product(Box<Product>),
    Products(ProductPage),
}
