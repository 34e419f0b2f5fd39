//! Session-stored directory state.
//!
//! Everything a signed-in browser needs between requests lives in one
//! [`SessionContext`] under [`keys::CONTEXT`]. It is created on sign-in and
//! discarded on sign-out, so nothing survives into the next session.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use donor_finder_core::{DirectoryFilter, Donor, Role};

use crate::services::identity::Identity;

/// Session keys.
pub mod keys {
    /// Key for the signed-in user's [`super::SessionContext`].
    pub const CONTEXT: &str = "directory_context";
}

/// Session-local copy of the donor collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryCache {
    /// Nothing fetched yet.
    #[default]
    NotLoaded,
    /// Last successful full load, in store order.
    Loaded(Vec<Donor>),
    /// Last load failed; the list stays empty until the next success.
    Failed(String),
}

impl DirectoryCache {
    /// Cached donors; empty unless loaded.
    #[must_use]
    pub fn donors(&self) -> &[Donor] {
        match self {
            Self::Loaded(donors) => donors,
            Self::NotLoaded | Self::Failed(_) => &[],
        }
    }

    /// Whether showing the list should trigger a load.
    #[must_use]
    pub const fn needs_load(&self) -> bool {
        !matches!(self, Self::Loaded(_))
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            Self::NotLoaded | Self::Loaded(_) => None,
        }
    }
}

/// Style of a one-shot alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashKind {
    Success,
    Error,
}

/// A one-shot alert shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// CSS modifier for the alert.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "alert-success",
            FlashKind::Error => "alert-error",
        }
    }
}

/// Per-session directory state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub identity: Identity,
    /// Resolved at sign-in; never read from anywhere but the registry.
    pub role: Role,
    pub cache: DirectoryCache,
    /// Active blood-group filter and search text.
    pub filter: DirectoryFilter,
    flash: Option<Flash>,
}

impl SessionContext {
    /// Fresh state for a newly signed-in identity.
    #[must_use]
    pub fn new(identity: Identity, role: Role) -> Self {
        Self {
            identity,
            role,
            cache: DirectoryCache::NotLoaded,
            filter: DirectoryFilter::default(),
            flash: None,
        }
    }

    /// Queue an alert for the next render, replacing any pending one.
    pub fn set_flash(&mut self, flash: Flash) {
        self.flash = Some(flash);
    }

    /// Take the pending alert, if any.
    pub const fn take_flash(&mut self) -> Option<Flash> {
        self.flash.take()
    }

    /// Read the context from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails or the stored value does
    /// not deserialize.
    pub async fn load(session: &Session) -> Result<Option<Self>, tower_sessions::session::Error> {
        session.get(keys::CONTEXT).await
    }

    /// Write the context back to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(keys::CONTEXT, self).await
    }
}
