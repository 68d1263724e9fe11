//! Session File - Atomic JSON Session Persistence
//!
//! Saves the signed-in session to `session.json` using atomic writes
//! (write to tmp file, then rename), so a crash never leaves a
//! half-written token behind. On Unix the file is readable by the
//! owner only.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, instrument};

/// Atomic JSON store for a single session value.
pub struct SessionFile {
    /// Path to session.json.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

impl SessionFile {
    /// Create a session file in the given data directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            path: dir.join("session.json"),
            tmp_path: dir.join("session.json.tmp"),
        })
    }

    /// Save the session atomically (tmp → rename).
    #[instrument(skip(self, session))]
    pub async fn save<T: Serialize + Sync>(&self, session: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(session)
            .context("Failed to serialize session")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp session file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.tmp_path, std::fs::Permissions::from_mode(0o600))
                .await
                .context("Failed to restrict session file permissions")?;
        }

        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename session file")?;

        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    /// Load the saved session.
    ///
    /// Returns `None` if no session file exists.
    #[instrument(skip(self))]
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context("Failed to read session file")?;

        let session = serde_json::from_str(&json).context("Failed to parse session JSON")?;
        Ok(Some(session))
    }

    /// Delete the saved session. Missing files are not an error.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove session file"),
        }
    }
}
