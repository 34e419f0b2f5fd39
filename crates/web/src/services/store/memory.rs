//! In-process document store.
//!
//! Keeps collections in insertion order and counts every call, so tests can
//! assert that a rejected mutation never reached the store. Reads and writes
//! can be made to fail to exercise the error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Document, DocumentStore, FieldValue, Fields, StoreError};

/// Length of generated document IDs (matches Firestore auto-IDs).
const AUTO_ID_LENGTH: usize = 20;

/// Call counters.
#[derive(Debug, Default)]
struct Calls {
    query: AtomicUsize,
    list: AtomicUsize,
    insert: AtomicUsize,
    delete: AtomicUsize,
}

/// Document store backed by in-memory collections.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    calls: Calls,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document directly, bypassing call counting. Returns its ID.
    pub fn seed(&self, collection: &str, fields: Fields) -> String {
        let id = auto_id();
        self.seed_with_id(collection, &id, fields);
        id
    }

    /// Insert a document with a chosen ID, bypassing call counting.
    pub fn seed_with_id(&self, collection: &str, id: &str, fields: Fields) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.to_string(),
                fields,
            });
    }

    /// Snapshot of a collection, bypassing call counting.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Make `query_eq` and `list` fail until turned off again.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `insert` and `delete` fail until turned off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn query_calls(&self) -> usize {
        self.calls.query.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.calls.list.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.calls.insert.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    /// Inserts plus deletes.
    #[must_use]
    pub fn mutation_calls(&self) -> usize {
        self.insert_calls() + self.delete_calls()
    }

    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "The service is currently unavailable.".to_string(),
            });
        }
        Ok(())
    }
}

fn auto_id() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(AUTO_ID_LENGTH)
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query_eq(
        &self,
        _id_token: &str,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Document>, StoreError> {
        self.calls.query.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_reads)?;
        Ok(self
            .documents(collection)
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }

    async fn list(&self, _id_token: &str, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_reads)?;
        Ok(self.documents(collection))
    }

    async fn insert(
        &self,
        _id_token: &str,
        collection: &str,
        fields: Fields,
    ) -> Result<String, StoreError> {
        self.calls.insert.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_writes)?;
        Ok(self.seed(collection, fields))
    }

    async fn delete(&self, _id_token: &str, collection: &str, id: &str) -> Result<(), StoreError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_writes)?;
        // Deleting a missing document succeeds, as in Firestore.
        if let Some(docs) = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(collection)
        {
            docs.retain(|doc| doc.id != id);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Self::check(&self.fail_reads)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), FieldValue::from(*v)))
            .collect()
    }

    #[tokio::test]
    async fn test_query_eq_matches_exactly() {
        let store = MemoryDocumentStore::new();
        store.seed("users", fields(&[("email", "a@x.org"), ("role", "admin")]));
        store.seed("users", fields(&[("email", "b@x.org"), ("role", "super_admin")]));

        let found = store
            .query_eq("t", "users", "email", &FieldValue::from("b@x.org"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].str_field("role"), Some("super_admin"));

        let none = store
            .query_eq("t", "users", "email", &FieldValue::from("B@x.org"))
            .await
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(store.query_calls(), 2);
    }

    #[tokio::test]
    async fn test_insert_list_delete() {
        let store = MemoryDocumentStore::new();
        let first = store
            .insert("t", "donors", fields(&[("name", "Asha")]))
            .await
            .unwrap();
        let second = store
            .insert("t", "donors", fields(&[("name", "Ravi")]))
            .await
            .unwrap();
        assert_eq!(first.len(), AUTO_ID_LENGTH);
        assert_ne!(first, second);

        store.delete("t", "donors", &first).await.unwrap();
        let remaining = store.list("t", "donors").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);
        assert_eq!(store.mutation_calls(), 3);
        assert_eq!(store.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryDocumentStore::new();
        store.set_fail_reads(true);
        assert!(store.list("t", "donors").await.is_err());
        assert!(store.ping().await.is_err());
        store.set_fail_reads(false);
        assert!(store.list("t", "donors").await.unwrap().is_empty());

        store.set_fail_writes(true);
        assert!(matches!(
            store.insert("t", "donors", Fields::new()).await,
            Err(StoreError::Api { status: 503, .. })
        ));
        assert!(store.documents("donors").is_empty());
    }

    #[tokio::test]
    async fn test_list_unknown_collection_is_empty() {
        let store = MemoryDocumentStore::new();
        assert!(store.list("t", "nothing").await.unwrap().is_empty());
    }
}
