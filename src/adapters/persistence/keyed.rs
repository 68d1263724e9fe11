//! Keyed Files - One Atomic JSON File per Document
//!
//! Documents written under a key live at `<collection>/<key>.json`.
//! Every write goes to a tmp file first and is renamed into place, so
//! readers see either the old or the new document, never a partial one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{instrument, warn};

use crate::ports::document_store::{Document, StoredDocument};

/// Directory of keyed JSON documents, one sub-directory per collection.
pub struct KeyedFiles {
    root: PathBuf,
}

impl KeyedFiles {
    /// Create a keyed store rooted at `data_dir`.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let root = Path::new(data_dir).to_path_buf();
        fs::create_dir_all(&root)
            .await
            .context("Failed to create data directory")?;
        Ok(Self { root })
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    /// Write `data` under `key`, replacing any previous document.
    #[instrument(skip(self, data))]
    pub async fn write(&self, collection: &str, key: &str, data: &Document) -> Result<()> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create collection directory {}", dir.display()))?;

        let path = dir.join(format!("{key}.json"));
        let tmp_path = dir.join(format!("{key}.json.tmp"));

        let json = serde_json::to_string_pretty(data).context("Failed to serialize document")?;

        fs::write(&tmp_path, &json)
            .await
            .context("Failed to write tmp document file")?;
        fs::rename(&tmp_path, &path)
            .await
            .context("Failed to rename document file")?;

        Ok(())
    }

    /// Read the document stored under `key`.
    pub async fn read(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let path = self.collection_dir(collection).join(format!("{key}.json"));
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(doc))
    }

    /// Load every keyed document of a collection.
    ///
    /// Unparseable files are skipped with a warning.
    #[instrument(skip(self))]
    pub async fn load_all(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Document>(&content) {
                Ok(data) => docs.push(StoredDocument {
                    id: key.to_string(),
                    data,
                }),
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "Skipping malformed document"
                    );
                }
            }
        }

        Ok(docs)
    }

    /// Check if the data directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.root.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
