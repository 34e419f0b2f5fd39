//! Document store boundary.
//!
//! The directory uses two collections: [`USERS`] (the role registry, read
//! only) and [`DONORS`]. Every call carries the signed-in user's ID token.

mod error;
pub mod firestore;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::StoreError;
pub use firestore::FirestoreClient;
pub use memory::MemoryDocumentStore;

/// Role registry collection.
pub const USERS: &str = "users";
/// Donor directory collection.
pub const DONORS: &str = "donors";

/// Document fields by name.
pub type Fields = BTreeMap<String, FieldValue>;

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Base64-encoded bytes, kept encoded.
    Bytes(String),
    /// Path of another document.
    Reference(String),
    GeoPoint {
        latitude: f64,
        longitude: f64,
    },
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    /// The value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned ID (last path segment).
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// A string field, if present and a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_str)
    }
}

/// Remote document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents of `collection` whose `field` equals `value`.
    async fn query_eq(
        &self,
        id_token: &str,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Document>, StoreError>;

    /// Every document of `collection`.
    async fn list(&self, id_token: &str, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Insert a document and return the ID the store assigned.
    async fn insert(
        &self,
        id_token: &str,
        collection: &str,
        fields: Fields,
    ) -> Result<String, StoreError>;

    /// Delete a document by ID.
    async fn delete(&self, id_token: &str, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
