//! Queue file records.
//!
//! One delimited row per queued change, appended by the matching workflow
//! and consumed as a whole by the batch executor. An absent file is an empty
//! queue, not an error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One queued external-system mutation awaiting batch application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpdate {
    /// Target entity id on the remote service.
    pub station_id: String,
    /// Field to change.
    pub field: String,
    /// New value for the field.
    pub new_value: String,
    /// Human-readable label for preview and progress display.
    pub label: String,
    /// Match confidence from the matcher, if known.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Flat, appendable, truncatable queue file (CSV, no header row).
#[derive(Debug, Clone)]
pub struct QueueFile {
    /// Path of the queue file.
    path: PathBuf,
}

impl QueueFile {
    /// Creates a handle for the queue file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Queue file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every queued record in original order.
    ///
    /// Returns an empty list if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or a row
    /// cannot be parsed.
    pub fn load(&self) -> Result<Vec<PendingUpdate>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: PendingUpdate =
                row.with_context(|| format!("failed to parse {}", self.path.display()))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Appends one record, creating the file (and parent directory) if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, record: &PendingUpdate) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(record)
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }

    /// Empties the queue. A missing file is already empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be truncated.
    pub fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        std::fs::File::create(&self.path)
            .with_context(|| format!("failed to truncate {}", self.path.display()))?;
        Ok(())
    }
}
