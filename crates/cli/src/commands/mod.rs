//! CLI command implementations.

pub mod donors;
pub mod role;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

use donor_finder_core::{Email, EmailError};
use donor_finder_web::config::{ConfigError, WebConfig};
use donor_finder_web::models::SessionContext;
use donor_finder_web::services::IdentityError;
use donor_finder_web::services::directory::DirectoryError;
use donor_finder_web::services::fixture::FixtureError;
use donor_finder_web::state::{AppState, StateError};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Environment variable {0} is not set")]
    MissingPassword(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Sign-in failed: {0}")]
    SignIn(#[from] IdentityError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Could not load donors: {0}")]
    Load(String),

    #[error("Unknown blood group '{0}'")]
    UnknownGroup(String),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// A signed-in account with its resolved role.
pub struct SignedIn {
    pub state: AppState,
    pub ctx: SessionContext,
}

impl SignedIn {
    /// Build the configured backend, sign in, and resolve the role.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the password variable is
    /// unset, or sign-in fails.
    pub async fn new(email: &str, password_env: &str) -> Result<Self, CliError> {
        let email = Email::parse(email)?;
        let password = std::env::var(password_env)
            .map(SecretString::from)
            .map_err(|_| CliError::MissingPassword(password_env.to_string()))?;

        let state = AppState::from_config(WebConfig::from_env()?)?;
        let identity = state.identity().sign_in(&email, &password).await?;
        let role = state.roles().resolve(&identity).await;
        info!(email = %identity.email, role = %role, "Signed in");

        Ok(Self {
            state,
            ctx: SessionContext::new(identity, role),
        })
    }

    /// End the provider session. Failures are only logged.
    pub async fn sign_out(self) {
        if let Err(e) = self.state.identity().sign_out(&self.ctx.identity).await {
            tracing::warn!(error = %e, "Sign-out failed");
        }
    }
}
