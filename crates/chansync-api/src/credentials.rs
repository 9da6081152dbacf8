//! Credential record persistence.
//!
//! One JSON document per service under a credentials directory. An absent
//! file means "no credential yet," not an error. Writes are atomic from a
//! reader's perspective (write to a temp file, then rename into place).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored access/refresh credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Bearer access token.
    pub access: String,
    /// Refresh token; absent for password-only services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    /// When this pair was obtained.
    pub obtained_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: access.into(),
            refresh,
            obtained_at: Utc::now(),
        }
    }

    /// A record with an empty access token is equivalent to "no credential."
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.access.is_empty()
    }
}

/// File-backed credential store, one JSON document per service.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    /// Directory holding `{service}.json` files.
    dir: PathBuf,
}

impl CredentialStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the credential file for `service`.
    fn record_path(&self, service: &str) -> PathBuf {
        self.dir.join(format!("{service}.json"))
    }

    /// Loads the stored record for `service`.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    /// (store corruption, surfaced instead of silently discarded).
    pub fn load(&self, service: &str) -> Result<Option<CredentialRecord>> {
        let path = self.record_path(service);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let record: CredentialRecord = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(record))
    }

    /// Saves `record` for `service` with an atomic replace.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation, the temp-file write, or the
    /// rename fails. Callers treat this as "credential obtained this run but
    /// not durable" and keep the in-memory copy.
    pub fn save(&self, service: &str, record: &CredentialRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create directory {}", self.dir.display()))?;

        let path = self.record_path(service);
        let content =
            serde_json::to_string_pretty(record).context("failed to serialize credential")?;

        // Temp file in the same directory so the rename stays on one filesystem.
        let tmp_path = self.dir.join(format!("{service}.json.tmp"));
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Removes the stored record for `service`. Missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self, service: &str) -> Result<()> {
        let path = self.record_path(service);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", path.display()))
            }
        }
    }

    /// Directory holding the credential files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
