//! Diary entries and their persistence.
//!
//! Persistence always replaces the whole collection; there are no deltas.
//! The JSON store writes to a temporary sibling file and renames it over
//! the target so a crash never leaves a half-written list behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted record pairing a source text with its summary and optional illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    id: String,
    timestamp: DateTime<Utc>,
    source_content: String,
    summary: String,
    /// Inline images as `data:` URIs
    #[serde(default)]
    images: Vec<String>,
}

impl DiaryEntry {
    /// Create an entry with a fresh id and the current time.
    pub fn new(
        source_content: impl Into<String>,
        summary: impl Into<String>,
        images: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            source_content: source_content.into(),
            summary: summary.into(),
            images,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source_content(&self) -> &str {
        &self.source_content
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }
}

/// Errors from a diary store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Persistence collaborator for diary entries.
pub trait DiaryStore: Send + Sync {
    /// Load all entries, newest first.
    fn load(&self) -> Result<Vec<DiaryEntry>, StoreError>;

    /// Atomically replace the persisted collection.
    fn replace_all(&self, entries: &[DiaryEntry]) -> Result<(), StoreError>;
}

/// Diaries stored as a single JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileDiaryStore {
    path: PathBuf,
}

impl JsonFileDiaryStore {
    pub const FILE_NAME: &'static str = "diaries.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located at `<dir>/diaries.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiaryStore for JsonFileDiaryStore {
    fn load(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn replace_all(&self, entries: &[DiaryEntry]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(count = entries.len(), path = ?self.path, "diaries persisted");
        Ok(())
    }
}

/// In-memory store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryDiaryStore {
    entries: Mutex<Vec<DiaryEntry>>,
}

impl MemoryDiaryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiaryStore for MemoryDiaryStore {
    fn load(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.clone())
    }

    fn replace_all(&self, entries: &[DiaryEntry]) -> Result<(), StoreError> {
        let mut stored = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        *stored = entries.to_vec();
        Ok(())
    }
}

/// Prepend `entry` to the stored list and persist the whole list.
pub fn prepend_entry(
    store: &dyn DiaryStore,
    entry: DiaryEntry,
) -> Result<Vec<DiaryEntry>, StoreError> {
    let mut entries = store.load()?;
    entries.insert(0, entry);
    store.replace_all(&entries)?;
    Ok(entries)
}
