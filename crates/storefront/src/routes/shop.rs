//! Product listing and detail route handlers.
//!
//! Listing URLs carry the category id; the gender and title segments are
//! cosmetic and redirect to the canonical form when they drift.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::catalog::{
    Category, Pagination, Product, ProductQuery, SortOrder, product_path,
};
use bazaar_core::{CategoryId, Price, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::ApiError;
use crate::error::{AppError, Result};
use crate::filters;
use crate::services::visitor;
use crate::state::AppState;
use crate::views::{Layout, ProductCard, categories_or_empty};

/// Products per listing page.
pub const PER_PAGE: u32 = 12;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<CategoryId>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
}

impl ListingQuery {
    fn sort_order(&self) -> Option<SortOrder> {
        self.sort.as_deref().and_then(SortOrder::from_param)
    }

    fn filter(&self) -> Option<&str> {
        self.filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}

/// An entry of the sort picker.
#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Listing page template, used for `/shop` and category pages.
#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ShopTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub filter: String,
    pub sort_options: Vec<SortOption>,
    pub products: Vec<ProductCard>,
    pub total: u64,
    pub pagination: Pagination,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/show.html")]
pub struct ProductTemplate {
    pub layout: Layout,
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub rating: String,
    pub sell_count: i64,
    pub in_stock: bool,
    pub images: Vec<String>,
    pub category_title: Option<String>,
    pub category_href: Option<String>,
    pub in_cart: u32,
    pub is_favorite: bool,
    pub path: String,
}

fn sort_options(selected: Option<SortOrder>) -> Vec<SortOption> {
    SortOrder::ALL
        .into_iter()
        .map(|order| SortOption {
            value: order.as_param(),
            label: order.label(),
            selected: selected == Some(order),
        })
        .collect()
}

/// Link to another page of the same listing, keeping filter and sort.
fn page_href(action: &str, query: &ListingQuery, category: Option<CategoryId>, page: u32) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    if let Some(category) = category {
        params.append_pair("category", &category.to_string());
    }
    if let Some(filter) = query.filter() {
        params.append_pair("filter", filter);
    }
    if let Some(sort) = query.sort_order() {
        params.append_pair("sort", sort.as_param());
    }
    params.append_pair("page", &page.to_string());
    format!("{action}?{}", params.finish())
}

async fn render_listing(
    state: &AppState,
    session: &Session,
    heading: String,
    action: String,
    category: Option<CategoryId>,
    query: &ListingQuery,
) -> Result<ShopTemplate> {
    let layout = Layout::load(state, session).await?;
    let categories = categories_or_empty(state).await;
    let favorites = visitor::favorites(session).await?;

    let requested_page = query.page.unwrap_or(1).max(1);
    let api_query = ProductQuery {
        category,
        filter: query.filter().map(String::from),
        sort: query.sort_order(),
        limit: PER_PAGE,
        offset: Pagination::offset_for(requested_page, PER_PAGE),
    };
    let page = state.api().products(&api_query).await?;
    let pagination = Pagination::new(requested_page, PER_PAGE, page.total);

    // Links only carry the category on `/shop`; category pages encode it in the path.
    let link_category = if action == "/shop" { category } else { None };

    Ok(ShopTemplate {
        previous_href: pagination
            .has_previous()
            .then(|| page_href(&action, query, link_category, pagination.page - 1)),
        next_href: pagination
            .has_next()
            .then(|| page_href(&action, query, link_category, pagination.page + 1)),
        layout,
        heading,
        filter: query.filter().unwrap_or_default().to_string(),
        sort_options: sort_options(query.sort_order()),
        products: page
            .products
            .iter()
            .map(|p| ProductCard::new(p, &categories, &favorites))
            .collect(),
        total: page.total,
        pagination,
        action,
    })
}

/// Product listing with optional category, filter, sort and page.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListingQuery>,
) -> Result<ShopTemplate> {
    let heading = match query.filter() {
        Some(filter) => format!("Results for \u{201c}{filter}\u{201d}"),
        None => "All Products".to_string(),
    };
    render_listing(
        &state,
        &session,
        heading,
        "/shop".to_string(),
        query.category,
        &query,
    )
    .await
}

async fn find_category(state: &AppState, id: CategoryId) -> Result<Category> {
    state
        .api()
        .categories()
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))
}

/// Listing of one category.
#[instrument(skip(state, session))]
pub async fn category(
    State(state): State<AppState>,
    session: Session,
    Path((gender, name, category_id)): Path<(String, String, CategoryId)>,
    Query(query): Query<ListingQuery>,
) -> Result<Response> {
    let category = find_category(&state, category_id).await?;
    let canonical = category.path();
    if format!("/shop/{gender}/{name}/{category_id}") != canonical {
        return Ok(Redirect::permanent(&canonical).into_response());
    }

    let heading = format!("{} \u{2022} {}", category.gender.label(), category.title);
    Ok(render_listing(
        &state,
        &session,
        heading,
        canonical,
        Some(category.id),
        &query,
    )
    .await?
    .into_response())
}

async fn fetch_product(state: &AppState, id: ProductId) -> Result<Product> {
    match state.api().product(id).await {
        Ok(product) => Ok(product),
        Err(ApiError::NotFound(_)) => Err(AppError::NotFound(format!("product {id}"))),
        Err(e) => Err(e.into()),
    }
}

/// Product detail page.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path((gender, name, category_id, slug, product_id)): Path<(
        String,
        String,
        CategoryId,
        String,
        ProductId,
    )>,
) -> Result<Response> {
    let product = fetch_product(&state, product_id).await?;
    let categories = categories_or_empty(&state).await;
    let canonical = product_path(&categories, &product);
    let requested = format!("/shop/{gender}/{name}/{category_id}/{slug}/{product_id}");
    if requested != canonical && !canonical.starts_with("/product/") {
        return Ok(Redirect::permanent(&canonical).into_response());
    }

    Ok(render_product(&state, &session, &categories, product, canonical)
        .await?
        .into_response())
}

/// Short product link; redirects to the canonical detail page.
#[instrument(skip(state, session))]
pub async fn permalink(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Response> {
    let product = fetch_product(&state, product_id).await?;
    let categories = categories_or_empty(&state).await;
    let canonical = product_path(&categories, &product);
    if canonical.starts_with("/shop/") {
        return Ok(Redirect::permanent(&canonical).into_response());
    }

    Ok(render_product(&state, &session, &categories, product, canonical)
        .await?
        .into_response())
}

async fn render_product(
    state: &AppState,
    session: &Session,
    categories: &[Category],
    product: Product,
    path: String,
) -> Result<ProductTemplate> {
    let layout = Layout::load(state, session).await?;
    let cart = visitor::cart(session).await?;
    let favorites = visitor::favorites(session).await?;
    let category = product
        .category_id
        .and_then(|id| categories.iter().find(|c| c.id == id));

    let mut images = product.images.clone();
    images.sort_by_key(|image| image.index);

    Ok(ProductTemplate {
        layout,
        id: product.id,
        rating: format!("{:.1}", product.rating),
        sell_count: product.sell_count,
        in_stock: product.in_stock(),
        images: images.into_iter().map(|image| image.url).collect(),
        category_title: category.map(|c| c.title.clone()),
        category_href: category.map(Category::path),
        in_cart: cart.get(product.id).map_or(0, |item| item.count),
        is_favorite: favorites.contains(product.id),
        price: product.price,
        description: product.description,
        name: product.name,
        path,
    })
}
