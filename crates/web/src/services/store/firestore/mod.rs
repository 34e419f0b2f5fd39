//! Cloud Firestore REST client.
//!
//! Calls are authorised with the signed-in user's ID token, so Firestore
//! security rules see the same identity the browser client would.

pub mod value;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::{Document, DocumentStore, FieldValue, Fields, StoreError};
use crate::config::FirebaseConfig;
use value::{NewDocument, RawDocument, Value, encode_fields};

const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";

/// Documents requested per page when listing a collection.
const LIST_PAGE_SIZE: u32 = 300;

/// Cloud Firestore client.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    /// `.../projects/<project>/databases/<db>/documents`
    documents_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunQueryItem {
    document: Option<RawDocument>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

impl FirestoreClient {
    /// Create a client sharing `client`'s connection pool and timeout.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &FirebaseConfig) -> Self {
        Self::with_base_url(client, FIRESTORE_API_URL, config)
    }

    /// Create a client against a different API root (e.g. the emulator).
    #[must_use]
    pub fn with_base_url(client: reqwest::Client, base_url: &str, config: &FirebaseConfig) -> Self {
        let documents_url = format!(
            "{}/projects/{}/databases/{}/documents",
            base_url.trim_end_matches('/'),
            config.project_id,
            config.database_id,
        );
        Self {
            inner: Arc::new(FirestoreClientInner {
                client,
                documents_url,
            }),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{}",
            self.inner.documents_url,
            urlencoding::encode(collection)
        )
    }

    /// Parse a successful response body or map the error status.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        if !response.status().is_success() {
            return Err(Self::handle_error_status(response).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| StoreError::Parse(format!("Failed to parse response: {e}")))
    }

    /// Handle an error status code.
    async fn handle_error_status(response: reqwest::Response) -> StoreError {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return StoreError::Http(e),
        };

        // runQuery wraps errors in a one-element array.
        let envelope = serde_json::from_str::<ErrorEnvelope>(&body).ok().or_else(|| {
            serde_json::from_str::<Vec<ErrorEnvelope>>(&body)
                .ok()
                .and_then(|mut items| items.pop())
        });
        let (message, code) = envelope.map_or_else(
            || {
                (
                    status.canonical_reason().unwrap_or("unknown").to_string(),
                    String::new(),
                )
            },
            |e| (e.error.message, e.error.status),
        );

        match (status.as_u16(), code.as_str()) {
            (403, _) | (_, "PERMISSION_DENIED") => StoreError::PermissionDenied(message),
            (401, _) | (_, "UNAUTHENTICATED") => StoreError::Unauthenticated(message),
            (404, _) | (_, "NOT_FOUND") => StoreError::NotFound(message),
            (status, _) => StoreError::Api { status, message },
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    #[instrument(skip(self, id_token, value))]
    async fn query_eq(
        &self,
        id_token: &str,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Document>, StoreError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": Value::from(value),
                    }
                }
            }
        });

        let response = self
            .inner
            .client
            .post(format!("{}:runQuery", self.inner.documents_url))
            .bearer_auth(id_token)
            .json(&body)
            .send()
            .await?;

        let items: Vec<RunQueryItem> = Self::handle_response(response).await?;
        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(Document::try_from)
            .collect()
    }

    #[instrument(skip(self, id_token))]
    async fn list(&self, id_token: &str, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .inner
                .client
                .get(&url)
                .bearer_auth(id_token)
                .query(&ListQuery {
                    page_size: LIST_PAGE_SIZE,
                    page_token: page_token.as_deref(),
                })
                .send()
                .await?;

            let page: ListResponse = Self::handle_response(response).await?;
            for raw in page.documents {
                documents.push(Document::try_from(raw)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(count = documents.len(), "Listed collection");
        Ok(documents)
    }

    #[instrument(skip(self, id_token, fields))]
    async fn insert(
        &self,
        id_token: &str,
        collection: &str,
        fields: Fields,
    ) -> Result<String, StoreError> {
        let response = self
            .inner
            .client
            .post(self.collection_url(collection))
            .bearer_auth(id_token)
            .json(&NewDocument {
                fields: encode_fields(&fields),
            })
            .send()
            .await?;

        let created: RawDocument = Self::handle_response(response).await?;
        Ok(Document::try_from(created)?.id)
    }

    #[instrument(skip(self, id_token))]
    async fn delete(&self, id_token: &str, collection: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .inner
            .client
            .delete(format!(
                "{}/{}",
                self.collection_url(collection),
                urlencoding::encode(id)
            ))
            .bearer_auth(id_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_status(response).await);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        // Unauthenticated reads may be rejected by security rules; any answer
        // short of a server error means Firestore is reachable.
        let response = self
            .inner
            .client
            .get(self.collection_url(super::DONORS))
            .query(&[("pageSize", "1")])
            .send()
            .await?;

        if response.status().is_server_error() {
            return Err(Self::handle_error_status(response).await);
        }
        Ok(())
    }
}
