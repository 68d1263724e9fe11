//! Append Log - JSONL Documents with Generated Ids
//!
//! Appended documents go to `<collection>.jsonl`, one self-contained
//! JSON entry per line: `{"id": "...", "data": {...}}`. Lines are never
//! rewritten, which matches the append-only life of conversion records.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::ports::document_store::{Document, StoredDocument};

/// One line of a collection log.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogEntry {
    id: String,
    data: Document,
}

/// Append-only JSONL document logs, one file per collection.
pub struct AppendLog {
    root: PathBuf,
}

impl AppendLog {
    /// Create an append log rooted at `data_dir`.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let root = Path::new(data_dir).to_path_buf();
        fs::create_dir_all(&root)
            .await
            .context("Failed to create data directory")?;
        Ok(Self { root })
    }

    fn log_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.jsonl"))
    }

    /// Append a document and return its generated id.
    #[instrument(skip(self, data))]
    pub async fn append(&self, collection: &str, data: &Document) -> Result<String> {
        let entry = LogEntry {
            id: Uuid::new_v4().simple().to_string(),
            data: data.clone(),
        };

        let mut json = serde_json::to_string(&entry).context("Failed to serialize document")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(collection))
            .await
            .context("Failed to open collection log")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write document")?;

        file.flush().await.context("Failed to flush collection log")?;

        Ok(entry.id)
    }

    /// Load all appended documents of a collection, in append order.
    #[instrument(skip(self))]
    pub async fn load_all(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let path = self.log_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut docs = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => docs.push(StoredDocument {
                    id: entry.id,
                    data: entry.data,
                }),
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "Skipping malformed log entry"
                    );
                }
            }
        }

        Ok(docs)
    }

    /// Find one appended document by id.
    pub async fn find(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(self
            .load_all(collection)
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .map(|d| d.data))
    }
}
