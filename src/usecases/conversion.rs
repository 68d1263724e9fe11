//! Conversion Service - Convert, Record and Recall
//!
//! Converts an amount between two catalog currencies, appends the
//! result to the conversions collection, and reads a user's history
//! back newest first. A failed save never hides the computed result.

use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::{AmountError, ConversionModel, Currency, RateLookup, RateSource, RateTable, parse_amount};
use crate::ports::document_store::{Direction, DocumentStore, Query, to_document};
use crate::ports::identity::IdentityProvider;

/// Notice shown after a successful save.
pub const SAVED_NOTICE: &str = "Conversion saved successfully";

/// How the save of a conversion went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
  /// Stored under the given document id.
  Saved { id: String },
  /// The store rejected the record.
  Failed { message: String },
}

/// Everything the front-end needs after a conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
  pub record: ConversionModel,
  pub rate: RateLookup,
  pub save: SaveStatus,
}

impl ConversionOutcome {
  /// Result line, e.g. `100.00 USD equals 92.50 EUR`.
  pub fn summary(&self) -> String {
    self.record.summary()
  }

  /// Save notice for the user.
  pub fn notice(&self) -> String {
    match &self.save {
      SaveStatus::Saved { .. } => SAVED_NOTICE.to_string(),
      SaveStatus::Failed { message } => format!("Failed to save conversion: {message}"),
    }
  }
}

/// Conversion use case.
pub struct ConversionService {
  /// Rate lookup table.
  table: RateTable,
  /// Identity port (uid of the saved records).
  identity: Arc<dyn IdentityProvider>,
  /// Document store port.
  store: Arc<dyn DocumentStore>,
  /// Conversions collection name.
  collection: String,
  /// Conversion counters.
  metrics: Arc<MetricsRegistry>,
}

impl ConversionService {
  /// Create a new conversion service.
  pub fn new(
    table: RateTable,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    collection: &str,
    metrics: Arc<MetricsRegistry>,
  ) -> Self {
    Self {
      table,
      identity,
      store,
      collection: collection.to_string(),
      metrics,
    }
  }

  /// The rate table in use.
  pub fn table(&self) -> &RateTable {
    &self.table
  }

  /// Parse `input` and convert it.
  ///
  /// # Errors
  /// Returns the parse error; nothing is saved in that case.
  pub async fn convert_input(
    &self,
    input: &str,
    source: &Currency,
    target: &Currency,
  ) -> Result<ConversionOutcome, AmountError> {
    let amount = parse_amount(input)?;
    Ok(self.convert(amount, source, target).await)
  }

  /// Convert `amount` from `source` to `target` and append the record.
  #[instrument(skip(self, source, target), fields(source = source.code, target = target.code))]
  pub async fn convert(&self, amount: f64, source: &Currency, target: &Currency) -> ConversionOutcome {
    let rate = self.table.lookup(source.code, target.code);
    if rate.source == RateSource::Fallback {
      warn!(
        source = source.code,
        target = target.code,
        "No rate listed for pair, using 1.0"
      );
      self.metrics.rate_fallbacks.inc();
    }

    let user_id = self
      .identity
      .current_user()
      .await
      .map(|u| u.uid)
      .unwrap_or_default();

    let record = ConversionModel {
      user_id,
      timestamp: Utc::now().timestamp_millis(),
      amount,
      source_currency: source.code.to_string(),
      target_currency: target.code.to_string(),
      result: amount * rate.rate,
    };

    self
      .metrics
      .conversions
      .with_label_values(&[source.code, target.code])
      .inc();

    let save = match self.save(&record).await {
      Ok(id) => {
        self.metrics.conversion_saves.with_label_values(&["saved"]).inc();
        info!(id = %id, summary = %record.summary(), "Conversion saved");
        SaveStatus::Saved { id }
      }
      Err(e) => {
        self.metrics.conversion_saves.with_label_values(&["failed"]).inc();
        warn!(error = %e, "Failed to save conversion");
        SaveStatus::Failed {
          message: e.to_string(),
        }
      }
    };

    ConversionOutcome { record, rate, save }
  }

  async fn save(&self, record: &ConversionModel) -> Result<String> {
    let document = to_document(record)?;
    self.store.append_document(&self.collection, &document).await
  }

  /// The signed-in user's conversions, newest first.
  ///
  /// # Errors
  /// Fails when nobody is signed in or the store query fails.
  #[instrument(skip(self))]
  pub async fn history(&self, limit: usize) -> Result<Vec<ConversionModel>> {
    let Some(user) = self.identity.current_user().await else {
      bail!("Sign in to see your conversion history");
    };

    let query = Query::new()
      .where_eq("userId", user.uid.as_str())
      .order_by("timestamp", Direction::Descending)
      .limit(limit);

    let documents = self.store.query_documents(&self.collection, &query).await?;
    let records: Vec<ConversionModel> = documents
      .iter()
      .filter_map(|doc| match doc.parse() {
        Ok(record) => Some(record),
        Err(e) => {
          warn!(id = %doc.id, error = %e, "Skipping malformed conversion");
          None
        }
      })
      .collect();

    debug!(count = records.len(), "History loaded");
    Ok(records)
  }
}
