//! Authentication route handlers.
//!
//! Sign-in authenticates with the identity provider, resolves the role from
//! the registry, loads the directory, and stores a fresh session context.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;

use donor_finder_core::Email;

use super::EXPIRED_CODE;
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{end_session, is_signed_in};
use crate::models::SessionContext;
use crate::services::IdentityError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    /// Previously entered email, kept after a failed attempt.
    pub email: String,
}

impl LoginTemplate {
    fn failed(email: String, err: &IdentityError) -> Self {
        Self {
            error: Some(format!("Error: {err}")),
            email,
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display the login page.
///
/// Already signed-in browsers go straight to the directory.
pub async fn login_page(session: Session, Query(query): Query<MessageQuery>) -> Response {
    if is_signed_in(&session).await {
        return Redirect::to("/donors").into_response();
    }

    let error = query.error.map(|code| match code.as_str() {
        EXPIRED_CODE => format!("Error: {}", IdentityError::SessionExpired),
        _ => "Error: Sign-in failed. Please try again.".to_string(),
    });

    LoginTemplate {
        error,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let entered = form.email.trim().to_string();

    let email = match Email::parse(&entered) {
        Ok(email) => email,
        Err(e) => {
            let err = IdentityError::InvalidEmail(e.to_string());
            return (StatusCode::UNPROCESSABLE_ENTITY, LoginTemplate::failed(entered, &err))
                .into_response();
        }
    };
    let password = SecretString::from(form.password);

    let identity = match state.identity().sign_in(&email, &password).await {
        Ok(identity) => identity,
        Err(e) => {
            let status = if e.is_user_error() {
                tracing::warn!(error = %e, "Sign-in rejected");
                StatusCode::UNAUTHORIZED
            } else {
                tracing::error!(error = %e, "Sign-in failed");
                StatusCode::BAD_GATEWAY
            };
            return (status, LoginTemplate::failed(entered, &e)).into_response();
        }
    };

    let role = state.roles().resolve(&identity).await;
    let mut ctx = SessionContext::new(identity, role);
    state.directory().load(&mut ctx).await;

    // New session ID on privilege change
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to cycle session id");
        return Redirect::to("/auth/login?error=session").into_response();
    }
    if let Err(e) = ctx.save(&session).await {
        tracing::error!(error = %e, "Failed to store session context");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    set_sentry_user(&ctx.identity.uid, ctx.identity.email.as_str());
    add_breadcrumb("auth", "Signed in", &[("role", role.as_str())]);
    tracing::info!(email = %ctx.identity.email, role = %role, "Signed in");

    Redirect::to("/donors").into_response()
}

/// Handle logout.
///
/// Ends the provider session when there is one, then discards all session
/// state.
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    match SessionContext::load(&session).await {
        Ok(Some(ctx)) => {
            if let Err(e) = state.identity().sign_out(&ctx.identity).await {
                tracing::warn!(error = %e, "Provider sign-out failed");
            }
            tracing::info!(email = %ctx.identity.email, "Signed out");
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Unreadable session on sign-out"),
    }

    if let Err(e) = end_session(&session).await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();

    Redirect::to("/auth/login").into_response()
}
