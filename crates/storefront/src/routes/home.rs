//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use bazaar_core::catalog::{Category, ProductQuery, SortOrder};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::services::visitor;
use crate::state::AppState;
use crate::views::{Layout, ProductCard, categories_or_empty};

/// Number of best sellers on the home page.
const BESTSELLER_COUNT: u32 = 8;

/// Number of highlighted categories on the home page.
const FEATURED_CATEGORY_COUNT: usize = 5;

/// A highlighted category tile.
#[derive(Clone)]
pub struct CategoryTile {
    pub title: String,
    pub audience: &'static str,
    pub href: String,
    pub image: Option<String>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub categories: Vec<CategoryTile>,
    pub bestsellers: Vec<ProductCard>,
}

/// Top-rated categories, best first.
fn featured_categories(categories: &[Category]) -> Vec<CategoryTile> {
    let mut sorted: Vec<&Category> = categories.iter().collect();
    sorted.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    sorted
        .into_iter()
        .take(FEATURED_CATEGORY_COUNT)
        .map(|c| CategoryTile {
            title: c.title.clone(),
            audience: c.gender.label(),
            href: c.path(),
            image: c.img.clone().filter(|img| !img.is_empty()),
        })
        .collect()
}

/// Display the home page: top categories and best sellers.
///
/// Catalog failures leave the sections empty instead of failing the page.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<HomeTemplate> {
    let layout = Layout::load(&state, &session).await?;
    let categories = categories_or_empty(&state).await;
    let favorites = visitor::favorites(&session).await?;

    let query = ProductQuery {
        sort: Some(SortOrder::RatingDesc),
        limit: BESTSELLER_COUNT,
        ..ProductQuery::default()
    };
    let bestsellers = match state.api().products(&query).await {
        Ok(page) => page
            .products
            .iter()
            .map(|p| ProductCard::new(p, &categories, &favorites))
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to load best sellers: {e}");
            Vec::new()
        }
    };

    Ok(HomeTemplate {
        layout,
        categories: featured_categories(&categories),
        bestsellers,
    })
}

#[cfg(test)]
mod tests {
    use bazaar_core::CategoryId;
    use bazaar_core::catalog::Gender;

    use super::*;

    #[test]
    fn test_featured_categories_sorted_by_rating() {
        let categories: Vec<Category> = (1..=7)
            .map(|i| Category {
                id: CategoryId::new(i),
                code: String::new(),
                title: format!("Category {i}"),
                gender: Gender::Women,
                img: Some(String::new()),
                #[allow(clippy::cast_precision_loss)]
                rating: i as f64,
            })
            .collect();

        let tiles = featured_categories(&categories);
        assert_eq!(tiles.len(), FEATURED_CATEGORY_COUNT);
        assert_eq!(tiles[0].title, "Category 7");
        assert_eq!(tiles[0].href, "/shop/women/category-7/7");
        assert!(tiles[0].image.is_none());
    }
}
