//! Local Document Store - Concrete Adapter for the DocumentStore Port
//!
//! Wraps `KeyedFiles` (atomic JSON per key) and `AppendLog` (JSONL per
//! collection) into a single struct that implements the `DocumentStore`
//! trait from `crate::ports::document_store`. Queries scan both.

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::keyed::KeyedFiles;
use super::log::AppendLog;
use crate::ports::document_store::{
    Direction, Document, DocumentStore, Query, StoredDocument, validate_collection, validate_key,
};

/// File-backed document store.
pub struct LocalDocumentStore {
    /// Keyed documents.
    keyed: KeyedFiles,
    /// Appended documents.
    log: AppendLog,
    /// Serializes writers; readers never block.
    write_lock: Mutex<()>,
}

impl LocalDocumentStore {
    /// Create a store from existing keyed and log stores.
    pub fn new(keyed: KeyedFiles, log: AppendLog) -> Self {
        Self {
            keyed,
            log,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store in a data directory.
    pub async fn from_data_dir(data_dir: &str) -> Result<Self> {
        let keyed = KeyedFiles::new(data_dir).await?;
        let log = AppendLog::new(data_dir).await?;
        Ok(Self::new(keyed, log))
    }

    /// Check if the data directory is writable.
    pub async fn is_healthy(&self) -> bool {
        self.keyed.is_healthy().await
    }
}

/// Order two optional field values; missing values always sort last.
fn compare_field(a: Option<&Value>, b: Option<&Value>, direction: Direction) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = compare_values(x, y);
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Cross-type order: null < bool < number < string < array < object.
const fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn write_document(&self, collection: &str, key: &str, data: &Document) -> Result<()> {
        validate_collection(collection)?;
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;
        self.keyed.write(collection, key, data).await
    }

    async fn append_document(&self, collection: &str, data: &Document) -> Result<String> {
        validate_collection(collection)?;
        let _guard = self.write_lock.lock().await;
        self.log.append(collection, data).await
    }

    async fn get_document(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        validate_collection(collection)?;
        validate_key(key)?;
        if let Some(doc) = self.keyed.read(collection, key).await? {
            return Ok(Some(doc));
        }
        self.log.find(collection, key).await
    }

    async fn query_documents(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>> {
        validate_collection(collection)?;

        let mut docs = self.keyed.load_all(collection).await?;
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs.extend(self.log.load_all(collection).await?);

        docs.retain(|d| query.matches(&d.data));

        if let Some(order) = &query.order_by {
            docs.sort_by(|a, b| {
                compare_field(
                    a.data.get(&order.field),
                    b.data.get(&order.field),
                    order.direction,
                )
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }

        debug!(collection, count = docs.len(), "Local query");
        Ok(docs)
    }
}
