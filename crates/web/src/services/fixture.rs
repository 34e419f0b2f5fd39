//! YAML fixtures.
//!
//! One format serves two purposes: seeding the memory backend for local
//! development, and the CLI's `seed` command, which reads only `donors`.
//!
//! ```yaml
//! accounts:
//!   - email: admin@example.org
//!     password: correct-horse
//!     role: admin
//! donors:
//!   - name: Asha Rao
//!     group: B+
//!     city: Mumbai
//!     phone: "+911234567890"
//!     last_donated: 2025-12-01
//! ```

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use donor_finder_core::{NewDonor, Role};

use super::directory::{DonorForm, donor_fields};
use super::identity::MemoryIdentityProvider;
use super::store::{FieldValue, Fields, MemoryDocumentStore, DONORS, USERS};

/// Errors that can occur while reading a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid fixture YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid donor #{index}: {source}")]
    Donor {
        index: usize,
        source: donor_finder_core::DonorError,
    },
}

/// A sign-in account, optionally with a registry role.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAccount {
    pub email: String,
    pub password: String,
    /// Written to the role registry when present.
    pub role: Option<Role>,
}

/// Parsed fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub accounts: Vec<FixtureAccount>,
    #[serde(default)]
    pub donors: Vec<DonorForm>,
}

impl Fixture {
    /// Parse fixture YAML.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Yaml` if the document does not match the format.
    pub fn from_yaml(yaml: &str) -> Result<Self, FixtureError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Validate every donor entry.
    ///
    /// # Errors
    ///
    /// Returns the first invalid entry (1-based index).
    pub fn validated_donors(&self) -> Result<Vec<NewDonor>, FixtureError> {
        let now = Utc::now();
        self.donors
            .iter()
            .enumerate()
            .map(|(i, d)| {
                NewDonor::new(&d.name, &d.group, &d.city, &d.phone, &d.last_donated, now)
                    .map_err(|source| FixtureError::Donor {
                        index: i + 1,
                        source,
                    })
            })
            .collect()
    }

    /// Load accounts, role records, and donors into the memory backend.
    ///
    /// # Errors
    ///
    /// Returns an error if a donor entry is invalid; nothing is seeded then.
    pub fn seed_memory(
        &self,
        identity: &MemoryIdentityProvider,
        store: &MemoryDocumentStore,
    ) -> Result<(), FixtureError> {
        let donors = self.validated_donors()?;

        for account in &self.accounts {
            identity.add_account(&account.email, &account.password);
            if let Some(role) = account.role {
                let mut fields = Fields::new();
                fields.insert("email".to_string(), FieldValue::from(account.email.as_str()));
                fields.insert("role".to_string(), FieldValue::from(role.as_str()));
                store.seed(USERS, fields);
            }
        }
        for donor in &donors {
            store.seed(DONORS, donor_fields(donor));
        }

        tracing::info!(
            accounts = self.accounts.len(),
            donors = donors.len(),
            "Seeded memory backend"
        );
        Ok(())
    }
}
