//! Catalog types: products, categories, and the URLs that address them.
//!
//! Products are read-only here; the backend is the source of truth and the
//! storefront only renders and links to them.

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Price, ProductId, StoreId};

/// A product image as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub index: u32,
}

/// A product as listed by the catalog endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub sell_count: i64,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl Product {
    /// URL of the first image, ordered by the backend's `index`.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .iter()
            .min_by_key(|image| image.index)
            .map(|image| image.url.as_str())
    }

    /// Whether the product can be added to the cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Audience a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "k")]
    Women,
    #[serde(rename = "e")]
    Men,
}

impl Gender {
    /// Path segment used in shop URLs.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Women => "women",
            Self::Men => "men",
        }
    }

    /// Heading used in navigation.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Women => "Women",
            Self::Men => "Men",
        }
    }

    /// Parse a path segment produced by [`Gender::slug`].
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "women" | "k" => Some(Self::Women),
            "men" | "e" => Some(Self::Men),
            _ => None,
        }
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub code: String,
    pub title: String,
    pub gender: Gender,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub rating: f64,
}

impl Category {
    /// Listing page for this category.
    #[must_use]
    pub fn path(&self) -> String {
        format!(
            "/shop/{}/{}/{}",
            self.gender.slug(),
            slugify(&self.title),
            self.id
        )
    }

    /// Detail page of `product` nested under this category.
    #[must_use]
    pub fn product_path(&self, product: &Product) -> String {
        format!(
            "{}/{}/{}",
            self.path(),
            slugify(&product.name),
            product.id
        )
    }
}

/// Canonical detail page of `product`, or `/product/{id}` (which redirects
/// there) when its category is not among `categories`.
#[must_use]
pub fn product_path(categories: &[Category], product: &Product) -> String {
    product
        .category_id
        .and_then(|id| categories.iter().find(|c| c.id == id))
        .map_or_else(
            || format!("/product/{}", product.id),
            |category| category.product_path(product),
        )
}

/// Lowercase, ASCII-only, dash-separated version of `text`.
///
/// Common Latin letters with diacritics are folded to their base letter so
/// that product names in the catalog still produce readable URLs.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        let c = fold_diacritic(c);
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

const fn fold_diacritic(c: char) -> char {
    match c {
        'ç' => 'c',
        'ğ' => 'g',
        'ı' | 'î' | 'ï' | 'í' | 'ì' => 'i',
        'ö' | 'ó' | 'ò' | 'ô' => 'o',
        'ş' => 's',
        'ü' | 'ú' | 'ù' | 'û' => 'u',
        'á' | 'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'ñ' => 'n',
        other => other,
    }
}

/// Sort orders accepted by the product listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "price:asc")]
    PriceAsc,
    #[serde(rename = "price:desc")]
    PriceDesc,
    #[serde(rename = "rating:asc")]
    RatingAsc,
    #[serde(rename = "rating:desc")]
    RatingDesc,
}

impl SortOrder {
    /// All options in the order they appear in the sort picker.
    pub const ALL: [Self; 4] = [
        Self::PriceAsc,
        Self::PriceDesc,
        Self::RatingAsc,
        Self::RatingDesc,
    ];

    /// Query-string value understood by the backend.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::PriceAsc => "price:asc",
            Self::PriceDesc => "price:desc",
            Self::RatingAsc => "rating:asc",
            Self::RatingDesc => "rating:desc",
        }
    }

    /// Label shown in the sort picker.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
            Self::RatingAsc => "Rating: Low to High",
            Self::RatingDesc => "Rating: High to Low",
        }
    }

    /// Parse a query-string value; unknown values are ignored.
    #[must_use]
    pub fn from_param(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_param() == value)
    }
}

/// Parameters of a product listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub category: Option<CategoryId>,
    pub filter: Option<String>,
    pub sort: Option<SortOrder>,
    pub limit: u32,
    pub offset: u32,
}

impl ProductQuery {
    /// Query-string pairs in the order the backend documents them.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(category) = self.category {
            pairs.push(("category", category.to_string()));
        }
        if let Some(filter) = self.filter.as_deref().map(str::trim)
            && !filter.is_empty()
        {
            pairs.push(("filter", filter.to_string()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_param().to_string()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub total: u64,
    pub products: Vec<Product>,
}

/// Page arithmetic for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl Pagination {
    /// Build pagination for a 1-based `page`, clamping it into range once the
    /// total is known.
    #[must_use]
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        let pages = total.div_ceil(u64::from(per_page)).max(1);
        let total_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        Self {
            page: page.clamp(1, total_pages),
            per_page,
            total_pages,
        }
    }

    /// Offset of the first item of a 1-based page (before the total is known).
    #[must_use]
    pub const fn offset_for(page: u32, per_page: u32) -> u32 {
        page.saturating_sub(1).saturating_mul(per_page)
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(name: &str) -> Product {
        Product {
            id: ProductId::new(9),
            name: name.to_string(),
            description: String::new(),
            price: Price::from_cents(1000),
            stock: 3,
            store_id: None,
            category_id: Some(CategoryId::new(2)),
            rating: 4.5,
            sell_count: 10,
            images: vec![
                ProductImage {
                    url: "https://img/2.jpg".to_string(),
                    index: 1,
                },
                ProductImage {
                    url: "https://img/1.jpg".to_string(),
                    index: 0,
                },
            ],
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Graphic T-Shirt (Blue)"), "graphic-t-shirt-blue");
        assert_eq!(slugify("  Tişört  "), "tisort");
        assert_eq!(slugify("Ayakkabı & Çanta"), "ayakkabi-canta");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_product_path() {
        let category = Category {
            id: CategoryId::new(2),
            code: "k:tisort".to_string(),
            title: "Tişört".to_string(),
            gender: Gender::Women,
            img: None,
            rating: 4.0,
        };
        assert_eq!(category.path(), "/shop/women/tisort/2");
        assert_eq!(
            category.product_path(&product("Cotton Tee")),
            "/shop/women/tisort/2/cotton-tee/9"
        );

        let categories = [category];
        assert_eq!(
            product_path(&categories, &product("Cotton Tee")),
            "/shop/women/tisort/2/cotton-tee/9"
        );
        let mut orphan = product("Cotton Tee");
        orphan.category_id = None;
        assert_eq!(product_path(&categories, &orphan), "/product/9");
    }

    #[test]
    fn test_primary_image_uses_lowest_index() {
        assert_eq!(product("x").primary_image(), Some("https://img/1.jpg"));
    }

    #[test]
    fn test_category_deserializes_backend_gender_codes() {
        let json = r#"{"id":1,"code":"e:ayakkabi","title":"Ayakkabı","gender":"e","rating":4.1}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.gender, Gender::Men);
        assert_eq!(Gender::from_slug("men"), Some(Gender::Men));
        assert_eq!(Gender::from_slug("kids"), None);
    }

    #[test]
    fn test_sort_order_params() {
        assert_eq!(SortOrder::from_param("rating:desc"), Some(SortOrder::RatingDesc));
        assert_eq!(SortOrder::from_param("name"), None);
    }

    #[test]
    fn test_query_pairs_skip_blank_filter() {
        let query = ProductQuery {
            category: Some(CategoryId::new(3)),
            filter: Some("  ".to_string()),
            sort: Some(SortOrder::PriceAsc),
            limit: 12,
            offset: 24,
        };
        let pairs = query.to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("category", "3".to_string()),
                ("sort", "price:asc".to_string()),
                ("limit", "12".to_string()),
                ("offset", "24".to_string()),
            ]
        );
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(2, 12, 30);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_previous());
        assert!(p.has_next());

        let p = Pagination::new(9, 12, 30);
        assert_eq!(p.page, 3);
        assert!(!p.has_next());

        let p = Pagination::new(1, 12, 0);
        assert_eq!(p.total_pages, 1);
        assert_eq!(Pagination::offset_for(3, 12), 24);
        assert_eq!(Pagination::offset_for(0, 12), 0);
    }
}
