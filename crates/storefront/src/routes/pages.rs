//! Static page route handlers: about, contact and pricing.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::state::AppState;
use crate::views::Layout;

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub layout: Layout,
}

/// A plan on the pricing page.
#[derive(Clone)]
pub struct Plan {
    pub name: &'static str,
    pub price: &'static str,
    pub features: &'static [&'static str],
    pub highlighted: bool,
}

/// Seller plans.
pub const PLANS: &[Plan] = &[
    Plan {
        name: "Starter",
        price: "Free",
        features: &["Up to 20 products", "Standard listing", "Email support"],
        highlighted: false,
    },
    Plan {
        name: "Business",
        price: "$29/month",
        features: &["Unlimited products", "Featured listings", "Sales reports"],
        highlighted: true,
    },
    Plan {
        name: "Enterprise",
        price: "Contact us",
        features: &["Dedicated manager", "Custom integrations", "Priority support"],
        highlighted: false,
    },
];

/// Pricing page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/pricing.html")]
pub struct PricingTemplate {
    pub layout: Layout,
    pub plans: &'static [Plan],
}

/// Display the About page.
#[instrument(skip(state, session))]
pub async fn about(State(state): State<AppState>, session: Session) -> Result<AboutTemplate> {
    Ok(AboutTemplate {
        layout: Layout::load(&state, &session).await?,
    })
}

/// Display the Contact page.
#[instrument(skip(state, session))]
pub async fn contact(State(state): State<AppState>, session: Session) -> Result<ContactTemplate> {
    Ok(ContactTemplate {
        layout: Layout::load(&state, &session).await?,
    })
}

/// Display the Pricing page.
#[instrument(skip(state, session))]
pub async fn pricing(State(state): State<AppState>, session: Session) -> Result<PricingTemplate> {
    Ok(PricingTemplate {
        layout: Layout::load(&state, &session).await?,
        plans: PLANS,
    })
}
