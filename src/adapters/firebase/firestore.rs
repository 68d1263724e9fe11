//! Cloud Firestore Document Store - REST Adapter
//!
//! Implements the `DocumentStore` port on the Firestore v1 REST API.
//! Documents are translated to Firestore typed values on the way out
//! and back to plain JSON on the way in. Requests carry the signed-in
//! user's id token when a `FirebaseAuth` is attached, so security rules
//! see the same identity as the app.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::auth::FirebaseAuth;
use super::client::{ApiError, FirebaseClient};
use super::types::{decode_fields, document_id, encode_fields, encode_value};
use crate::ports::document_store::{
    Direction, Document, DocumentStore, Query, StoredDocument, validate_collection, validate_key,
};

/// Firestore-backed document store.
pub struct FirestoreStore {
    /// Shared HTTP client.
    client: Arc<FirebaseClient>,
    /// Source of bearer tokens, if requests should be authenticated.
    auth: Option<Arc<FirebaseAuth>>,
    /// `.../projects/{project}/databases/{database}/documents`
    documents_url: String,
}

impl FirestoreStore {
    /// Create a store for one project database.
    pub fn new(
        client: Arc<FirebaseClient>,
        base_url: &str,
        project_id: &str,
        database: &str,
    ) -> Self {
        Self {
            client,
            auth: None,
            documents_url: format!(
                "{}/projects/{}/databases/{}/documents",
                base_url.trim_end_matches('/'),
                project_id,
                database
            ),
        }
    }

    /// Authenticate requests with the session of `auth`.
    #[must_use]
    pub fn with_auth(mut self, auth: Arc<FirebaseAuth>) -> Self {
        self.auth = Some(auth);
        self
    }

    async fn bearer(&self) -> Result<Option<String>> {
        match &self.auth {
            Some(auth) => auth.id_token().await,
            None => Ok(None),
        }
    }

    /// URL of `segments` below the documents root, each segment
    /// percent-encoded on its own.
    fn document_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.documents_url)
            .with_context(|| format!("Invalid Firestore URL {}", self.documents_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Firestore URL cannot take a path: {}", self.documents_url))?
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.bearer().await?;
        self.client
            .send_json(method, url, body, token.as_deref())
            .await
    }
}

/// Build a `runQuery` request body.
fn structured_query(collection: &str, query: &Query) -> Value {
    let mut structured = json!({
        "from": [{ "collectionId": collection }],
    });

    let filters: Vec<Value> = query
        .filters
        .iter()
        .map(|f| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": f.field },
                    "op": "EQUAL",
                    "value": encode_value(&f.value),
                }
            })
        })
        .collect();

    match filters.len() {
        0 => {}
        1 => structured["where"] = filters[0].clone(),
        _ => {
            structured["where"] = json!({
                "compositeFilter": { "op": "AND", "filters": filters }
            });
        }
    }

    if let Some(order) = &query.order_by {
        let direction = match order.direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured["orderBy"] = json!([{
            "field": { "fieldPath": order.field },
            "direction": direction,
        }]);
    }

    if let Some(limit) = query.limit {
        structured["limit"] = json!(limit);
    }

    json!({ "structuredQuery": structured })
}

/// Decode a Firestore document resource into id + fields.
fn decode_document(resource: &Value) -> Result<StoredDocument> {
    let name = resource
        .get("name")
        .and_then(Value::as_str)
        .context("Document without name")?;
    let data = match resource.get("fields") {
        Some(fields) => decode_fields(fields)?,
        None => Document::new(),
    };
    Ok(StoredDocument {
        id: document_id(name).to_string(),
        data,
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self, data))]
    async fn write_document(&self, collection: &str, key: &str, data: &Document) -> Result<()> {
        validate_collection(collection)?;
        validate_key(key)?;

        let url = self.document_url(&[collection, key])?;
        let body = json!({ "fields": encode_fields(data) });
        self.send(Method::PATCH, url.as_str(), Some(&body))
            .await
            .with_context(|| format!("Failed to write {collection}/{key}"))?;

        debug!("Document written");
        Ok(())
    }

    #[instrument(skip(self, data))]
    async fn append_document(&self, collection: &str, data: &Document) -> Result<String> {
        validate_collection(collection)?;

        let url = self.document_url(&[collection])?;
        let body = json!({ "fields": encode_fields(data) });
        let response = self
            .send(Method::POST, url.as_str(), Some(&body))
            .await
            .with_context(|| format!("Failed to append to {collection}"))?;

        let stored = decode_document(&response)?;
        debug!(id = %stored.id, "Document appended");
        Ok(stored.id)
    }

    #[instrument(skip(self))]
    async fn get_document(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        validate_collection(collection)?;
        validate_key(key)?;

        let url = self.document_url(&[collection, key])?;
        match self.send(Method::GET, url.as_str(), None).await {
            Ok(resource) => Ok(Some(decode_document(&resource)?.data)),
            Err(e) if ApiError::has_status(&e, StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e.context(format!("Failed to read {collection}/{key}"))),
        }
    }

    #[instrument(skip(self, query))]
    async fn query_documents(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>> {
        validate_collection(collection)?;

        let url = format!("{}:runQuery", self.documents_url);
        let body = structured_query(collection, query);
        let response = self
            .send(Method::POST, &url, Some(&body))
            .await
            .with_context(|| format!("Failed to query {collection}"))?;

        // One entry per result; entries without `document` only carry readTime
        let rows = response.as_array().cloned().unwrap_or_default();
        let docs = rows
            .iter()
            .filter_map(|row| row.get("document"))
            .map(decode_document)
            .collect::<Result<Vec<_>>>()?;

        debug!(count = docs.len(), "Query returned documents");
        Ok(docs)
    }
}
