//! Donor directory operations.
//!
//! Loads the donor collection into the session cache and performs the two
//! mutations. Mutations check the caller's role before anything else, so an
//! insufficient role never reaches the identity provider or the store.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use donor_finder_core::{Donor, DonorError, DonorId, LastDonated, NewDonor, Role};

use super::identity::{IdentityError, IdentityProvider, ensure_fresh};
use super::store::{DONORS, Document, DocumentStore, FieldValue, Fields, StoreError};
use crate::models::{DirectoryCache, SessionContext};

/// Alert shown when a role below admin tries to add a donor.
pub const ADD_FORBIDDEN: &str = "Unauthorized! You do not have permission.";
/// Alert shown when a role below super admin tries to delete a donor.
pub const DELETE_FORBIDDEN: &str = "Unauthorized! Only Super Admins can delete.";

/// Stored field names.
mod field {
    pub const NAME: &str = "name";
    pub const GROUP: &str = "group";
    pub const CITY: &str = "city";
    pub const PHONE: &str = "phone";
    pub const LAST_DONATED: &str = "lastDonated";
    pub const CREATED_AT: &str = "createdAt";
}

/// Errors from directory mutations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The caller's role does not allow the operation.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// The submitted donor failed validation.
    #[error(transparent)]
    Invalid(#[from] DonorError),

    /// The ID token could not be refreshed.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The store rejected or failed the call.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raw add-donor form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonorForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub last_donated: String,
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Confirmation was declined; nothing was sent to the store.
    Declined,
}

/// Directory operations over the document store.
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl DirectoryService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    /// Fetch the entire donor collection.
    ///
    /// Documents whose ID is not a usable donor ID are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the list call fails.
    pub async fn fetch(&self, id_token: &str) -> Result<Vec<Donor>, StoreError> {
        let documents = self.store.list(id_token, DONORS).await?;
        Ok(documents.into_iter().filter_map(donor_from_document).collect())
    }

    /// Replace the session's cache with a fresh full load.
    ///
    /// Never fails: a failed load leaves the cache in the `Failed` state.
    #[instrument(skip(self, ctx), fields(email = %ctx.identity.email))]
    pub async fn load(&self, ctx: &mut SessionContext) {
        if let Err(e) = ensure_fresh(self.identity.as_ref(), &mut ctx.identity).await {
            tracing::warn!(error = %e, "Token refresh before load failed");
            ctx.cache = DirectoryCache::Failed(e.to_string());
            return;
        }

        ctx.cache = match self.fetch(&ctx.identity.id_token).await {
            Ok(donors) => {
                tracing::debug!(count = donors.len(), "Directory loaded");
                DirectoryCache::Loaded(donors)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load directory");
                DirectoryCache::Failed(e.to_string())
            }
        };
    }

    /// Add a donor and reload the cache.
    ///
    /// Returns the assigned ID, or `None` when the store assigned one that is
    /// not a usable donor ID. The record is saved either way.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the role is below admin (checked first)
    /// - `Invalid` if the form fails validation
    /// - `Identity` if the token could not be refreshed
    /// - `Store` if the insert fails
    #[instrument(skip(self, ctx, form), fields(email = %ctx.identity.email, role = %ctx.role))]
    pub async fn add(
        &self,
        ctx: &mut SessionContext,
        form: &DonorForm,
        now: DateTime<Utc>,
    ) -> Result<Option<DonorId>, DirectoryError> {
        authorize(ctx.role, Role::can_add_donors, ADD_FORBIDDEN)?;

        let donor = NewDonor::new(
            &form.name,
            &form.group,
            &form.city,
            &form.phone,
            &form.last_donated,
            now,
        )?;

        ensure_fresh(self.identity.as_ref(), &mut ctx.identity).await?;
        let id = self
            .store
            .insert(&ctx.identity.id_token, DONORS, donor_fields(&donor))
            .await?;
        tracing::info!(donor_id = %id, group = %donor.group, "Donor added");

        self.load(ctx).await;
        match DonorId::parse(&id) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                tracing::warn!(donor_id = %id, error = %e, "Store assigned an unusable donor id");
                Ok(None)
            }
        }
    }

    /// Delete a donor once confirmed, then reload the cache.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the role is below super admin (checked first)
    /// - `Identity` if the token could not be refreshed
    /// - `Store` if the delete fails
    #[instrument(skip(self, ctx), fields(email = %ctx.identity.email, role = %ctx.role))]
    pub async fn delete(
        &self,
        ctx: &mut SessionContext,
        id: &DonorId,
        confirmed: bool,
    ) -> Result<DeleteOutcome, DirectoryError> {
        authorize(ctx.role, Role::can_delete_donors, DELETE_FORBIDDEN)?;

        if !confirmed {
            tracing::debug!(donor_id = %id, "Delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        ensure_fresh(self.identity.as_ref(), &mut ctx.identity).await?;
        self.store
            .delete(&ctx.identity.id_token, DONORS, id.as_str())
            .await?;
        tracing::info!(donor_id = %id, "Donor deleted");

        self.load(ctx).await;
        Ok(DeleteOutcome::Deleted)
    }
}

fn authorize(
    role: Role,
    allowed: fn(Role) -> bool,
    message: &'static str,
) -> Result<(), DirectoryError> {
    if allowed(role) {
        Ok(())
    } else {
        tracing::warn!(role = %role, "Blocked unauthorized mutation");
        Err(DirectoryError::Unauthorized(message))
    }
}

/// Fields written for a new donor.
///
/// `createdAt` is an ISO-8601 string with millisecond precision, the format
/// existing records use.
#[must_use]
pub fn donor_fields(donor: &NewDonor) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::NAME.to_string(), donor.name.clone().into());
    fields.insert(field::GROUP.to_string(), donor.group.as_str().into());
    fields.insert(field::CITY.to_string(), donor.city.clone().into());
    fields.insert(field::PHONE.to_string(), donor.phone.as_str().into());
    fields.insert(
        field::LAST_DONATED.to_string(),
        donor.last_donated.to_stored().into(),
    );
    fields.insert(
        field::CREATED_AT.to_string(),
        donor
            .created_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .into(),
    );
    fields
}

/// Read a donor from a stored document, tolerating missing fields.
#[must_use]
pub fn donor_from_document(doc: Document) -> Option<Donor> {
    let id = match DonorId::parse(&doc.id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(doc_id = %doc.id, error = %e, "Skipping donor with unusable id");
            return None;
        }
    };

    let created_at = match doc.fields.get(field::CREATED_AT) {
        Some(FieldValue::Timestamp(ts)) => Some(*ts),
        Some(FieldValue::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        _ => None,
    };

    Some(Donor {
        id,
        name: text_field(&doc, field::NAME),
        group: text_field(&doc, field::GROUP),
        city: text_field(&doc, field::CITY),
        phone: text_field(&doc, field::PHONE),
        last_donated: LastDonated::from_stored(text_field(&doc, field::LAST_DONATED).as_deref()),
        created_at,
    })
}

/// A field rendered as text. Numbers are accepted since phone numbers are
/// sometimes stored as integers.
fn text_field(doc: &Document, name: &str) -> Option<String> {
    match doc.fields.get(name)? {
        FieldValue::String(s) => Some(s.clone()),
        FieldValue::Integer(i) => Some(i.to_string()),
        FieldValue::Double(d) => Some(d.to_string()),
        _ => None,
    }
}
