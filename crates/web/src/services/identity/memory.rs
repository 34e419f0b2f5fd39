//! In-process identity provider.
//!
//! Accounts live in a map keyed by lower-cased email. Used by the test suite
//! and by the `memory` backend for local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use donor_finder_core::Email;

use super::{Identity, IdentityError, IdentityProvider};

struct Account {
    uid: String,
    email: Email,
    password: SecretString,
    disabled: bool,
}

/// Identity provider backed by an in-memory account table.
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    /// Refresh token -> email of the identity it was issued to.
    refresh_tokens: RwLock<HashMap<String, String>>,
    token_ttl: Duration,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            refresh_tokens: RwLock::new(HashMap::new()),
            token_ttl: Duration::hours(1),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    /// Issue ID tokens that expire after `ttl`.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Register an account. Invalid emails are logged and skipped.
    pub fn add_account(&self, email: &str, password: &str) {
        let email = match Email::parse(email) {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(email, error = %e, "Skipping account with invalid email");
                return;
            }
        };
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                email.as_str().to_lowercase(),
                Account {
                    uid: Uuid::new_v4().simple().to_string(),
                    email,
                    password: SecretString::from(password),
                    disabled: false,
                },
            );
    }

    /// Disable an account so further sign-ins fail.
    pub fn disable_account(&self, email: &str) {
        if let Some(account) = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&email.to_lowercase())
        {
            account.disabled = true;
        }
    }

    /// Number of `sign_in` calls made, successful or not.
    #[must_use]
    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    /// Number of `sign_out` calls made.
    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    fn issue(&self, uid: &str, email: &Email) -> Identity {
        let refresh_token = format!("mem-refresh-{}", Uuid::new_v4().simple());
        self.refresh_tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(refresh_token.clone(), email.as_str().to_lowercase());
        Identity {
            uid: uid.to_string(),
            email: email.clone(),
            id_token: format!("mem-id-{}", Uuid::new_v4().simple()),
            refresh_token,
            expires_at: Utc::now() + self.token_ttl,
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);

        let (uid, stored_email) = {
            let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
            let account = accounts
                .get(&email.as_str().to_lowercase())
                .ok_or(IdentityError::InvalidCredentials)?;
            if account.password.expose_secret() != password.expose_secret() {
                return Err(IdentityError::InvalidCredentials);
            }
            if account.disabled {
                return Err(IdentityError::UserDisabled);
            }
            (account.uid.clone(), account.email.clone())
        };

        Ok(self.issue(&uid, &stored_email))
    }

    async fn refresh(&self, identity: &Identity) -> Result<Identity, IdentityError> {
        let owner = self
            .refresh_tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&identity.refresh_token)
            .ok_or(IdentityError::SessionExpired)?;

        let (uid, email) = {
            let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
            let account = accounts.get(&owner).ok_or(IdentityError::SessionExpired)?;
            if account.disabled {
                return Err(IdentityError::UserDisabled);
            }
            (account.uid.clone(), account.email.clone())
        };

        Ok(self.issue(&uid, &email))
    }

    async fn sign_out(&self, identity: &Identity) -> Result<(), IdentityError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&identity.refresh_token);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_is_case_insensitive_on_email() {
        let provider = MemoryIdentityProvider::new();
        provider.add_account("Ravi@Example.org", "pw-1");

        let identity = provider
            .sign_in(&email("ravi@example.org"), &SecretString::from("pw-1"))
            .await
            .unwrap();
        assert_eq!(identity.email.as_str(), "Ravi@Example.org");
        assert_eq!(provider.sign_in_calls(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_credentials() {
        let provider = MemoryIdentityProvider::new();
        provider.add_account("ravi@example.org", "pw-1");

        let wrong_password = provider
            .sign_in(&email("ravi@example.org"), &SecretString::from("pw-2"))
            .await;
        assert!(matches!(wrong_password, Err(IdentityError::InvalidCredentials)));

        let unknown = provider
            .sign_in(&email("nobody@example.org"), &SecretString::from("pw-1"))
            .await;
        assert!(matches!(unknown, Err(IdentityError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_disabled_account() {
        let provider = MemoryIdentityProvider::new();
        provider.add_account("ravi@example.org", "pw-1");
        provider.disable_account("ravi@example.org");

        let result = provider
            .sign_in(&email("ravi@example.org"), &SecretString::from("pw-1"))
            .await;
        assert!(matches!(result, Err(IdentityError::UserDisabled)));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_refresh_token() {
        let provider = MemoryIdentityProvider::new();
        provider.add_account("ravi@example.org", "pw-1");
        let identity = provider
            .sign_in(&email("ravi@example.org"), &SecretString::from("pw-1"))
            .await
            .unwrap();

        provider.sign_out(&identity).await.unwrap();
        assert_eq!(provider.sign_out_calls(), 1);
        assert!(matches!(
            provider.refresh(&identity).await,
            Err(IdentityError::SessionExpired)
        ));
    }
}
