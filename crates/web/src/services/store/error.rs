//! Document store errors.

use thiserror::Error;

/// Errors that can occur when talking to the document store.
///
/// The `Display` text is shown to the user in write-failure alerts.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Security rules rejected the call.
    #[error("Missing or insufficient permissions: {0}")]
    PermissionDenied(String),

    /// The ID token was missing, invalid, or expired.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The addressed document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The store returned an error not covered above.
    #[error("Store error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the store.
        message: String,
    },

    /// Failed to parse the store's response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl StoreError {
    /// Whether the error was a rules/authentication rejection rather than an
    /// outage.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::Unauthenticated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Api {
            status: 503,
            message: "The service is currently unavailable.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Store error (503): The service is currently unavailable."
        );
        assert!(!err.is_rejection());
        assert!(StoreError::PermissionDenied("donors".to_string()).is_rejection());
    }
}
