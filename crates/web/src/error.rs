//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before rendering an alert page. Route handlers return
//! `Result<T, AppError>`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::filters;
use crate::services::{DirectoryError, IdentityError, StoreError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Identity provider call failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Document store call failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The caller's role does not allow the action. The message is shown as is.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unauthorized(message) => Self::Forbidden(message.to_string()),
            DirectoryError::Invalid(e) => Self::BadRequest(e.to_string()),
            DirectoryError::Identity(e) => Self::Identity(e),
            DirectoryError::Store(e) => Self::Store(e),
        }
    }
}

/// Full-page alert used for error responses.
#[derive(Template, WebTemplate)]
#[template(path = "alert.html")]
pub struct AlertTemplate {
    pub title: &'static str,
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Identity(err) if err.is_user_error() => StatusCode::UNAUTHORIZED,
            Self::Store(err) if err.is_rejection() => StatusCode::FORBIDDEN,
            Self::Identity(_) | Self::Store(_) => StatusCode::BAD_GATEWAY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the error is the server's fault and worth reporting.
    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let (title, message) = match &self {
            Self::Session(_) | Self::Internal(_) => ("Error", "Internal server error".to_string()),
            Self::Identity(err) if err.is_user_error() => ("Signed out", err.to_string()),
            Self::Identity(_) => ("Error", "Sign-in service error".to_string()),
            Self::Store(err) if err.is_rejection() => ("Unauthorized", err.to_string()),
            Self::Store(_) => ("Error", "External service error".to_string()),
            Self::Forbidden(message) => ("Unauthorized", message.clone()),
            Self::NotFound(what) => ("Not found", format!("{what} not found.")),
            Self::BadRequest(message) => ("Invalid request", message.clone()),
        };

        (status, AlertTemplate { title, message }).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful sign-in to associate errors with users.
pub fn set_sentry_user(uid: &str, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(uid.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
