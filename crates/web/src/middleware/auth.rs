//! Authentication extractors.
//!
//! Every directory route requires a signed-in session; anything else is sent
//! to the login page.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::SessionContext;

/// Login page path.
pub const LOGIN_PATH: &str = "/auth/login";

/// Extractor that requires a signed-in session.
///
/// Handlers mutate `ctx` and call [`RequireSession::save`] to persist it.
///
/// ```rust,ignore
/// async fn handler(mut signed_in: RequireSession) -> Result<Response> {
///     signed_in.ctx.filter = DirectoryFilter::default();
///     signed_in.save().await?;
///     ...
/// }
/// ```
pub struct RequireSession {
    pub session: Session,
    pub ctx: SessionContext,
}

impl RequireSession {
    /// Persist the context back into the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn save(&self) -> Result<(), tower_sessions::session::Error> {
        self.ctx.save(&self.session).await
    }
}

/// Rejection for requests without a usable session.
#[derive(Debug)]
pub enum AuthRejection {
    /// No signed-in context; go to the login page.
    RedirectToLogin,
    /// The session layer is missing from the stack.
    MissingSessionLayer,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::MissingSessionLayer => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSessionLayer)?;

        let ctx = match SessionContext::load(&session).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => return Err(AuthRejection::RedirectToLogin),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable session context");
                return Err(AuthRejection::RedirectToLogin);
            }
        };

        Ok(Self { session, ctx })
    }
}

/// Whether the request already carries a signed-in context.
pub async fn is_signed_in(session: &Session) -> bool {
    matches!(SessionContext::load(session).await, Ok(Some(_)))
}

/// Discard all session state (sign-out or expired credentials).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn end_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
