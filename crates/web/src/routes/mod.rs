//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to the directory
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (document store reachable)
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Sign in
//! POST /auth/logout            - Sign out
//!
//! # Directory (requires a signed-in session)
//! GET  /donors                 - Donor list (query: group, q)
//! POST /donors                 - Add donor (admin and above)
//! POST /donors/refresh         - Reload the directory
//! GET  /donors/new             - Add donor form (admin and above)
//! GET  /donors/{id}/delete     - Delete confirmation (super admin)
//! POST /donors/{id}/delete     - Delete donor (super admin)
//! ```

pub mod auth;
pub mod donors;
pub mod health;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::clear_sentry_user;
use crate::middleware::end_session;
use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Query code shown on the login page after the session expired.
pub const EXPIRED_CODE: &str = "expired";

/// Create the auth routes router.
///
/// The limiter, when given, applies to `POST /auth/login` only.
pub fn auth_routes(login_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let login = match login_limiter {
        Some(limiter) => post(auth::login).layer(limiter),
        None => post(auth::login),
    };
    Router::new()
        .route("/login", get(auth::login_page).merge(login))
        .route("/logout", post(auth::logout))
}

/// Create the donor directory routes router.
pub fn donor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(donors::index).post(donors::create))
        .route("/refresh", post(donors::refresh))
        .route("/new", get(donors::new_form))
        .route(
            "/{id}/delete",
            get(donors::confirm_delete).post(donors::delete),
        )
}

/// Create all routes for the application.
pub fn routes(login_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/donors") }))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes(login_limiter))
        .nest("/donors", donor_routes())
}

/// Drop the session and send the browser to sign in again.
pub(crate) async fn expire_session(session: &Session) -> Response {
    if let Err(e) = end_session(session).await {
        tracing::error!(error = %e, "Failed to flush expired session");
    }
    clear_sentry_user();
    Redirect::to(&format!("/auth/login?error={EXPIRED_CODE}")).into_response()
}
