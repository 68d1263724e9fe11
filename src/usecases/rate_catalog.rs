//! Rate Catalog - Publish and Read the Rates Collection
//!
//! Writes one `RateModel` per catalog currency, keyed by its code and
//! relative to the base currency, so other clients of the store can
//! read the same table the converter uses.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::domain::{RateModel, RateTable};
use crate::ports::document_store::{Direction, DocumentStore, Query, to_document};

/// Base currency of published rates.
pub const BASE_CURRENCY: &str = "USD";

/// Rates collection use case.
pub struct RateCatalog {
  table: RateTable,
  store: Arc<dyn DocumentStore>,
  collection: String,
}

impl RateCatalog {
  pub fn new(table: RateTable, store: Arc<dyn DocumentStore>, collection: &str) -> Self {
    Self {
      table,
      store,
      collection: collection.to_string(),
    }
  }

  /// Write every catalog rate. Returns the number of documents written.
  #[instrument(skip(self), fields(collection = %self.collection))]
  pub async fn publish(&self) -> Result<usize> {
    let rates = RateModel::catalog(&self.table, BASE_CURRENCY);
    for rate in &rates {
      let document = to_document(rate)?;
      self
        .store
        .write_document(&self.collection, &rate.code, &document)
        .await?;
    }

    info!(count = rates.len(), base = BASE_CURRENCY, "Rates published");
    Ok(rates.len())
  }

  /// Read the published rates, ordered by code.
  pub async fn load(&self) -> Result<Vec<RateModel>> {
    let query = Query::new().order_by("code", Direction::Ascending);
    let documents = self.store.query_documents(&self.collection, &query).await?;

    Ok(documents
      .iter()
      .filter_map(|doc| match doc.parse::<RateModel>() {
        Ok(rate) => Some(rate),
        Err(e) => {
          warn!(id = %doc.id, error = %e, "Skipping malformed rate");
          None
        }
      })
      .collect())
  }
}
