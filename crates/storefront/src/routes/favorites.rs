//! Favorites route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use bazaar_core::ProductId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::routes::redirect_back;
use crate::services::flash::{self, Flash};
use crate::services::visitor;
use crate::state::AppState;
use crate::views::{FavoriteLine, Layout, categories_or_empty};

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "favorites/index.html")]
pub struct FavoritesTemplate {
    pub layout: Layout,
    pub lines: Vec<FavoriteLine>,
}

/// Form naming one product.
#[derive(Debug, Deserialize)]
pub struct FavoriteForm {
    pub product_id: ProductId,
    pub return_to: Option<String>,
}

/// Display the favorites page.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<FavoritesTemplate> {
    let layout = Layout::load(&state, &session).await?;
    let favorites = visitor::favorites(&session).await?;
    let categories = categories_or_empty(&state).await;

    Ok(FavoritesTemplate {
        layout,
        lines: FavoriteLine::lines(&favorites, &categories),
    })
}

/// Add a product to favorites, or remove it if already there.
#[instrument(skip(state, session))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<FavoriteForm>,
) -> Result<Redirect> {
    let back = redirect_back(form.return_to.as_deref(), "/favorites");
    let mut favorites = visitor::favorites(&session).await?;

    if favorites.remove(form.product_id) {
        visitor::save_favorites(&session, &favorites).await?;
        return Ok(back);
    }

    match state.api().product(form.product_id).await {
        Ok(product) => {
            favorites.add(product);
            visitor::save_favorites(&session, &favorites).await?;
        }
        Err(e) => {
            tracing::warn!("Failed to load product {}: {e}", form.product_id);
            flash::push(&session, Flash::error(e.user_message("Could not update favorites")))
                .await;
        }
    }
    Ok(back)
}

/// Remove a product from favorites.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<FavoriteForm>) -> Result<Redirect> {
    let mut favorites = visitor::favorites(&session).await?;
    if favorites.remove(form.product_id) {
        visitor::save_favorites(&session, &favorites).await?;
    }
    Ok(redirect_back(form.return_to.as_deref(), "/favorites"))
}
