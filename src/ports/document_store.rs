//! Document Store Port - Remote Persistence Interface
//!
//! Schemaless JSON documents grouped in named collections. Supports
//! keyed create-or-replace, append with a store-generated id, single
//! reads and simple equality queries with one sort field.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// A document body: top-level JSON object.
pub type Document = Map<String, Value>;

/// A document together with its id inside the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
  /// Key or generated id.
  pub id: String,
  /// Document fields.
  pub data: Document,
}

impl StoredDocument {
  /// Deserialize the document body into a typed record.
  pub fn parse<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
    from_document(&self.data)
  }
}

/// Sort direction for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Ascending,
  Descending,
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
  pub field: String,
  pub value: Value,
}

/// Single-field ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
  pub field: String,
  pub direction: Direction,
}

/// Query over one collection.
///
/// All filters must match. Documents missing the order field sort last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
  pub filters: Vec<FieldFilter>,
  pub order_by: Option<OrderBy>,
  pub limit: Option<usize>,
}

impl Query {
  /// Empty query: every document, store order.
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an equality filter.
  #[must_use]
  pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
    self.filters.push(FieldFilter {
      field: field.to_string(),
      value: value.into(),
    });
    self
  }

  /// Order by a field.
  #[must_use]
  pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
    self.order_by = Some(OrderBy {
      field: field.to_string(),
      direction,
    });
    self
  }

  /// Return at most `limit` documents.
  #[must_use]
  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Whether a document satisfies every filter.
  pub fn matches(&self, data: &Document) -> bool {
    self
      .filters
      .iter()
      .all(|f| data.get(&f.field).is_some_and(|v| values_equal(v, &f.value)))
  }
}

/// Invalid collection or document name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
  #[error("{kind} name must not be empty")]
  Empty { kind: &'static str },
  #[error("{kind} name '{name}' must not contain '/'")]
  Slash { kind: &'static str, name: String },
  #[error("{kind} name '{name}' is reserved")]
  Reserved { kind: &'static str, name: String },
}

/// Validate a collection name.
pub fn validate_collection(name: &str) -> Result<(), NameError> {
  validate_name("Collection", name)
}

/// Validate a document key.
pub fn validate_key(name: &str) -> Result<(), NameError> {
  validate_name("Document", name)
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), NameError> {
  if name.is_empty() {
    return Err(NameError::Empty { kind });
  }
  if name.contains('/') {
    return Err(NameError::Slash {
      kind,
      name: name.to_string(),
    });
  }
  if name == "." || name == ".." {
    return Err(NameError::Reserved {
      kind,
      name: name.to_string(),
    });
  }
  Ok(())
}

/// Serialize a record into a document body.
///
/// # Errors
/// Returns error if the record does not serialize to a JSON object.
pub fn to_document<T: Serialize>(record: &T) -> anyhow::Result<Document> {
  match serde_json::to_value(record)? {
    Value::Object(map) => Ok(map),
    other => anyhow::bail!("Document must be a JSON object, got {other}"),
  }
}

/// Deserialize a document body into a typed record.
///
/// # Errors
/// Returns error if fields are missing or have the wrong type.
pub fn from_document<T: DeserializeOwned>(data: &Document) -> anyhow::Result<T> {
  Ok(serde_json::from_value(Value::Object(data.clone()))?)
}

/// Equality that treats `1` and `1.0` as the same number.
fn values_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
      (Some(x), Some(y)) => x == y,
      _ => x.as_f64() == y.as_f64(),
    },
    _ => a == b,
  }
}

/// Trait for document store providers.
///
/// Writes are last-writer-wins; appended documents are never mutated.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
  /// Create or replace the document stored under `key`.
  async fn write_document(
    &self,
    collection: &str,
    key: &str,
    data: &Document,
  ) -> anyhow::Result<()>;

  /// Append a new document and return its generated id.
  async fn append_document(&self, collection: &str, data: &Document) -> anyhow::Result<String>;

  /// Read the document stored under `key`.
  async fn get_document(&self, collection: &str, key: &str) -> anyhow::Result<Option<Document>>;

  /// Run a query over one collection.
  async fn query_documents(
    &self,
    collection: &str,
    query: &Query,
  ) -> anyhow::Result<Vec<StoredDocument>>;
}
