//! Identity provider errors.

use thiserror::Error;

/// Errors that can occur when signing in or refreshing a session.
///
/// The `Display` text is shown to the user on the login form, so it never
/// includes tokens or raw response bodies.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Email/password pair was rejected.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    /// The account exists but is disabled.
    #[error("This account has been disabled.")]
    UserDisabled,

    /// The provider is throttling sign-in attempts.
    #[error("Too many attempts. Try again later.")]
    TooManyAttempts,

    /// The email address is malformed.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// The refresh token was revoked or expired.
    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    /// HTTP request failed.
    #[error("Could not reach the sign-in service: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned an error not covered above.
    #[error("Sign-in failed ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error code.
        message: String,
    },

    /// Failed to parse the provider's response.
    #[error("Unexpected response from the sign-in service: {0}")]
    Parse(String),
}

impl IdentityError {
    /// Whether the error was caused by the user's input rather than the service.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::UserDisabled
                | Self::TooManyAttempts
                | Self::InvalidEmail(_)
                | Self::SessionExpired
        )
    }
}
