//! Identity provider boundary.
//!
//! Signing in exchanges an email/password pair for an [`Identity`] carrying a
//! short-lived ID token. The token accompanies every document store call so
//! the backend's security rules apply to the signed-in user.

mod error;
pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use donor_finder_core::Email;

pub use error::IdentityError;
pub use firebase::FirebaseAuthClient;
pub use memory::MemoryIdentityProvider;

/// Seconds before expiry at which a token is treated as expired.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// A signed-in identity.
///
/// Stored in the session, so tokens are plain strings; `Debug` redacts them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user ID.
    pub uid: String,
    pub email: Email,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    /// Whether the ID token is expired or about to expire.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::seconds(EXPIRY_SKEW_SECONDS)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Remote identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with an email/password pair.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<Identity, IdentityError>;

    /// Exchange the refresh token for a new ID token.
    async fn refresh(&self, identity: &Identity) -> Result<Identity, IdentityError>;

    /// End the identity's session with the provider.
    async fn sign_out(&self, identity: &Identity) -> Result<(), IdentityError>;
}

/// Refresh `identity` in place if its ID token has expired.
///
/// Returns `true` when a refresh happened and the caller should persist the
/// updated identity.
///
/// # Errors
///
/// Returns the provider's error if the refresh fails.
pub async fn ensure_fresh(
    provider: &dyn IdentityProvider,
    identity: &mut Identity,
) -> Result<bool, IdentityError> {
    if !identity.is_expired(Utc::now()) {
        return Ok(false);
    }
    tracing::debug!(uid = %identity.uid, "ID token expired, refreshing");
    *identity = provider.refresh(identity).await?;
    Ok(true)
}
