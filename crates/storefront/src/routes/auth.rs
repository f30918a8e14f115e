//! Authentication route handlers.
//!
//! Login and registration forms are validated locally first; the backend
//! only sees requests that pass. Validation failures re-render the form with
//! inline messages, backend failures re-render it with an error toast.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::account::Role;
use bazaar_core::validation::{FieldErrors, LoginForm, RegistrationForm};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::SignupRequest;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::models::CurrentUser;
use crate::services::flash::{self, Flash};
use crate::services::visitor;
use crate::state::AppState;
use crate::views::Layout;

/// Toast shown when the role list cannot be fetched.
pub const ROLES_UNAVAILABLE_MESSAGE: &str = "Could not load roles. Please try again.";

/// Toast shown after a successful signup.
pub const REGISTERED_MESSAGE: &str =
    "You need to click the link in your email to activate your account!";

// =============================================================================
// Redirect Helpers
// =============================================================================

/// Login page that returns to `from` afterwards.
#[must_use]
pub fn login_url(from: &str) -> String {
    format!("/login?from={}", urlencoding::encode(from))
}

/// Where to go after logging in: `from` if it is a local path, else `/`.
#[must_use]
pub fn post_login_target(from: Option<&str>) -> String {
    from.filter(|path| is_local_path(path))
        .unwrap_or("/")
        .to_string()
}

/// A path on this site, never another origin.
///
/// Browsers drop tabs and newlines from `Location`, so `/\t/host` would
/// become `//host`; any control or whitespace character is refused.
#[must_use]
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(|c| c.is_control() || c.is_whitespace())
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
}

/// Query parameters of the register page.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterQuery {
    /// Role to preselect, so the store fields can be shown without script.
    pub role_id: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub remember: bool,
    pub errors: FieldErrors,
    /// Form action, carrying the return path.
    pub action: String,
}

/// A role in the registration role picker.
#[derive(Debug, Clone)]
pub struct RoleOption {
    pub id: String,
    pub label: &'static str,
    pub is_store: bool,
    pub selected: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub roles: Vec<RoleOption>,
    pub form: RegistrationForm,
    pub errors: FieldErrors,
    pub show_store_fields: bool,
}

impl RegisterTemplate {
    fn new(layout: Layout, roles: &[Role], form: RegistrationForm, errors: FieldErrors) -> Self {
        let selected = form.selected_role();
        Self {
            layout,
            roles: roles
                .iter()
                .map(|role| RoleOption {
                    id: role.id.to_string(),
                    label: role.label(),
                    is_store: role.is_store(),
                    selected: selected == Some(role.id),
                })
                .collect(),
            show_store_fields: form.is_store_role(roles),
            form,
            errors,
        }
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(state, session))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    if visitor::current_user(&session).await?.is_some() {
        return Ok(Redirect::to(&post_login_target(query.from.as_deref())).into_response());
    }

    Ok(LoginTemplate {
        layout: Layout::load(&state, &session).await?,
        email: String::new(),
        remember: false,
        errors: FieldErrors::new(),
        action: login_action(query.from.as_deref()),
    }
    .into_response())
}

fn login_action(from: Option<&str>) -> String {
    match from.filter(|path| is_local_path(path)) {
        Some(from) => login_url(from),
        None => "/login".to_string(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            return render_login(&state, &session, &form, errors, None, &query).await;
        }
    };

    match state
        .api()
        .login(credentials.email.as_str(), credentials.password.expose_secret())
        .await
    {
        Ok(user) => {
            let user = CurrentUser::from(user);
            visitor::log_in(&session, &user, credentials.remember).await?;
            add_breadcrumb("auth", "Logged in", None);
            tracing::info!(remember = credentials.remember, "User logged in");
            Ok(Redirect::to(&post_login_target(query.from.as_deref())).into_response())
        }
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            let message = e.user_message("Login failed");
            render_login(&state, &session, &form, FieldErrors::new(), Some(message), &query).await
        }
    }
}

async fn render_login(
    state: &AppState,
    session: &Session,
    form: &LoginForm,
    errors: FieldErrors,
    failure: Option<String>,
    query: &LoginQuery,
) -> Result<Response> {
    let mut layout = Layout::load(state, session).await?;
    if let Some(message) = failure {
        layout.flash(Flash::error(message));
    }
    let template = LoginTemplate {
        layout,
        email: form.email.trim().to_string(),
        remember: form.remember.is_some(),
        errors,
        action: login_action(query.from.as_deref()),
    };
    Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
}

/// Log out and return to the home page.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    visitor::log_out(&session).await?;
    flash::push(&session, Flash::info("You have been logged out.")).await;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
///
/// The customer role is preselected; `?role_id=` overrides it.
#[instrument(skip(state, session))]
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RegisterQuery>,
) -> Result<Response> {
    let mut layout = Layout::load(&state, &session).await?;
    let roles = match state.api().roles().await {
        Ok(roles) => roles,
        Err(e) => {
            tracing::warn!("Failed to load roles: {e}");
            layout.flash(Flash::error(ROLES_UNAVAILABLE_MESSAGE));
            Vec::new()
        }
    };

    let mut form = RegistrationForm::with_default_role(&roles);
    if let Some(role_id) = query.role_id {
        form.role_id = role_id;
    }

    Ok(RegisterTemplate::new(layout, &roles, form, FieldErrors::new()).into_response())
}

/// Handle registration form submission.
///
/// Store details are only validated and sent for the store role.
#[instrument(skip(state, session, form), fields(email = %form.email, role_id = %form.role_id))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegistrationForm>,
) -> Result<Response> {
    let roles = match state.api().roles().await {
        Ok(roles) => roles,
        Err(e) => {
            tracing::warn!("Failed to load roles: {e}");
            let mut layout = Layout::load(&state, &session).await?;
            layout.flash(Flash::error(ROLES_UNAVAILABLE_MESSAGE));
            let template =
                RegisterTemplate::new(layout, &[], form.without_passwords(), FieldErrors::new());
            return Ok((StatusCode::SERVICE_UNAVAILABLE, template).into_response());
        }
    };

    let registration = match form.validate(&roles) {
        Ok(registration) => registration,
        Err(errors) => {
            let layout = Layout::load(&state, &session).await?;
            let template = RegisterTemplate::new(layout, &roles, form.without_passwords(), errors);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response());
        }
    };

    match state.api().signup(&SignupRequest::from(&registration)).await {
        Ok(()) => {
            tracing::info!(store = registration.store.is_some(), "User registered");
            flash::push(&session, Flash::success(REGISTERED_MESSAGE)).await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            let mut layout = Layout::load(&state, &session).await?;
            layout.flash(Flash::error(e.user_message("Registration failed")));
            let template =
                RegisterTemplate::new(layout, &roles, form.without_passwords(), FieldErrors::new());
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_return_path() {
        assert_eq!(login_url("/checkout"), "/login?from=%2Fcheckout");
        assert_eq!(
            login_url("/shop?sort=price:asc"),
            "/login?from=%2Fshop%3Fsort%3Dprice%3Aasc"
        );
    }

    #[test]
    fn test_post_login_target_only_allows_local_paths() {
        assert_eq!(post_login_target(Some("/checkout")), "/checkout");
        assert_eq!(post_login_target(Some("https://evil.example")), "/");
        assert_eq!(post_login_target(Some("//evil.example")), "/");
        assert_eq!(post_login_target(Some("/\\evil.example")), "/");
        assert_eq!(post_login_target(Some("/\t/evil.example")), "/");
        assert_eq!(post_login_target(Some("/\n/evil.example")), "/");
        assert_eq!(post_login_target(Some("/ /evil.example")), "/");
        assert_eq!(post_login_target(None), "/");
    }

    #[test]
    fn test_login_action_keeps_return_path() {
        assert_eq!(login_action(Some("/checkout")), "/login?from=%2Fcheckout");
        assert_eq!(login_action(Some("http://x")), "/login");
        assert_eq!(login_action(None), "/login");
    }
}
