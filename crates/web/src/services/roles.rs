//! Role resolution.
//!
//! After each sign-in the signed-in email is looked up in the `users`
//! registry. The lookup fails closed: no record, an unreadable record, or a
//! failed query all resolve to [`Role::User`].

use std::sync::Arc;

use tracing::instrument;

use donor_finder_core::Role;

use super::identity::Identity;
use super::store::{DocumentStore, FieldValue, USERS};

/// Registry field holding the email address.
const EMAIL_FIELD: &str = "email";
/// Registry field holding the role tag.
const ROLE_FIELD: &str = "role";

/// Resolves the role of a signed-in identity.
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn DocumentStore>,
    dev_override: bool,
}

impl RoleResolver {
    /// Create a resolver.
    ///
    /// With `dev_override` set, every identity resolves to
    /// [`Role::SuperAdmin`] without a lookup. Configuration only allows this
    /// in debug builds.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, dev_override: bool) -> Self {
        Self {
            store,
            dev_override,
        }
    }

    /// Resolve the role for `identity`. Never fails.
    #[instrument(skip(self, identity), fields(email = %identity.email))]
    pub async fn resolve(&self, identity: &Identity) -> Role {
        if self.dev_override {
            tracing::warn!("Developer role override is on; granting super_admin");
            return Role::SuperAdmin;
        }

        let records = match self
            .store
            .query_eq(
                &identity.id_token,
                USERS,
                EMAIL_FIELD,
                &FieldValue::from(identity.email.as_str()),
            )
            .await
        {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Role lookup failed; defaulting to user");
                return Role::User;
            }
        };

        let Some(record) = records.first() else {
            tracing::info!("No role record; defaulting to user");
            return Role::User;
        };
        if records.len() > 1 {
            tracing::warn!(
                matches = records.len(),
                record_id = %record.id,
                "Several role records match; using the first"
            );
        }

        let Some(value) = record.str_field(ROLE_FIELD) else {
            tracing::warn!(record_id = %record.id, "Role record has no string 'role' field");
            return Role::User;
        };

        let (role, recognized) = Role::from_registry(value);
        if recognized {
            tracing::info!(role = %role, "Role synced from registry");
        } else {
            tracing::warn!(value, record_id = %record.id, "Unrecognized role value; defaulting to user");
        }
        role
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use donor_finder_core::Email;

    use super::*;
    use crate::services::store::{Fields, MemoryDocumentStore};

    fn identity(email: &str) -> Identity {
        Identity {
            uid: "uid".to_string(),
            email: Email::parse(email).unwrap(),
            id_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    fn record(email: &str, role: Option<FieldValue>) -> Fields {
        let mut fields = Fields::new();
        fields.insert(EMAIL_FIELD.to_string(), FieldValue::from(email));
        if let Some(role) = role {
            fields.insert(ROLE_FIELD.to_string(), role);
        }
        fields
    }

    fn resolver(store: &Arc<MemoryDocumentStore>) -> RoleResolver {
        RoleResolver::new(store.clone(), false)
    }

    #[tokio::test]
    async fn test_no_record_is_user() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed(USERS, record("admin@x.org", Some("admin".into())));

        let role = resolver(&store).resolve(&identity("guest@x.org")).await;
        assert_eq!(role, Role::User);
        assert_eq!(store.query_calls(), 1);
    }

    #[tokio::test]
    async fn test_stored_roles() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed(USERS, record("admin@x.org", Some("admin".into())));
        store.seed(USERS, record("root@x.org", Some("super_admin".into())));

        let resolver = resolver(&store);
        assert_eq!(resolver.resolve(&identity("admin@x.org")).await, Role::Admin);
        assert_eq!(resolver.resolve(&identity("root@x.org")).await, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed(USERS, record("dup@x.org", Some("admin".into())));
        store.seed(USERS, record("dup@x.org", Some("super_admin".into())));

        assert_eq!(resolver(&store).resolve(&identity("dup@x.org")).await, Role::Admin);
    }

    #[tokio::test]
    async fn test_unreadable_records_fail_closed() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed(USERS, record("owner@x.org", Some("owner".into())));
        store.seed(USERS, record("blank@x.org", None));
        store.seed(USERS, record("typed@x.org", Some(FieldValue::Integer(2))));

        let resolver = resolver(&store);
        for email in ["owner@x.org", "blank@x.org", "typed@x.org"] {
            assert_eq!(resolver.resolve(&identity(email)).await, Role::User, "{email}");
        }
    }

    #[tokio::test]
    async fn test_query_failure_fails_closed() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed(USERS, record("root@x.org", Some("super_admin".into())));
        store.set_fail_reads(true);

        assert_eq!(resolver(&store).resolve(&identity("root@x.org")).await, Role::User);
    }

    #[tokio::test]
    async fn test_dev_override_skips_lookup() {
        let store = Arc::new(MemoryDocumentStore::new());
        let resolver = RoleResolver::new(store.clone(), true);

        assert_eq!(resolver.resolve(&identity("anyone@x.org")).await, Role::SuperAdmin);
        assert_eq!(store.query_calls(), 0);
    }
}
