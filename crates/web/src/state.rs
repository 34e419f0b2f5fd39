//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{Backend, WebConfig};
use crate::services::fixture::{Fixture, FixtureError};
use crate::services::identity::{FirebaseAuthClient, IdentityProvider, MemoryIdentityProvider};
use crate::services::store::{DocumentStore, FirestoreClient, MemoryDocumentStore};
use crate::services::{DirectoryService, RoleResolver};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("firebase backend selected but Firebase is not configured")]
    MissingFirebaseConfig,
    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    roles: RoleResolver,
    directory: DirectoryService,
}

impl AppState {
    /// Create state over explicit backends.
    #[must_use]
    pub fn new(
        config: WebConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let roles = RoleResolver::new(store.clone(), config.dev_role_override);
        let directory = DirectoryService::new(store.clone(), identity.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                store,
                roles,
                directory,
            }),
        }
    }

    /// Create state with the backend selected in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built, Firebase settings
    /// are missing, or the memory fixture is invalid.
    pub fn from_config(config: WebConfig) -> Result<Self, StateError> {
        match config.backend {
            Backend::Firebase => {
                let firebase = config
                    .firebase
                    .as_ref()
                    .ok_or(StateError::MissingFirebaseConfig)?;
                let http = reqwest::Client::builder()
                    .timeout(config.http_timeout)
                    .user_agent(concat!("donor-finder/", env!("CARGO_PKG_VERSION")))
                    .build()?;
                let identity = Arc::new(FirebaseAuthClient::new(http.clone(), firebase));
                let store = Arc::new(FirestoreClient::new(http, firebase));
                Ok(Self::new(config, identity, store))
            }
            Backend::Memory => {
                let identity = Arc::new(MemoryIdentityProvider::new());
                let store = Arc::new(MemoryDocumentStore::new());
                if let Some(path) = &config.memory_fixture {
                    Fixture::from_path(path)?.seed_memory(&identity, &store)?;
                } else {
                    tracing::warn!("Memory backend without a fixture; nobody can sign in");
                }
                Ok(Self::new(config, identity, store))
            }
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get the identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// Get the role resolver.
    #[must_use]
    pub fn roles(&self) -> &RoleResolver {
        &self.inner.roles
    }

    /// Get the directory service.
    #[must_use]
    pub fn directory(&self) -> &DirectoryService {
        &self.inner.directory
    }
}
