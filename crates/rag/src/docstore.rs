//! Durable document persistence behind the vector store.
//!
//! The in-memory store is authoritative for the process lifetime; the document
//! store only keeps summaries that warm-load can re-embed on the next start.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use studio_core::{AppError, AppResult};

use crate::types::{ChunkKind, Metadata, VectorRecord};

/// Characters kept in [`StoredDocument::summary`].
pub const SUMMARY_CHARS: usize = 200;

/// Persisted form of an indexed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredDocument {
    pub fn from_record(record: &VectorRecord) -> Self {
        let metadata = &record.metadata;
        Self {
            kind: metadata
                .kind
                .unwrap_or(ChunkKind::Document)
                .as_str()
                .to_string(),
            title: title_for(metadata).to_string(),
            content: record.content.clone(),
            summary: record.content.chars().take(SUMMARY_CHARS).collect(),
            project_id: metadata.project_id.clone(),
            created_at: record.created_at,
        }
    }

    /// Metadata restored on warm-load.
    pub fn metadata(&self) -> Metadata {
        Metadata {
            kind: ChunkKind::parse(&self.kind),
            title: Some(self.title.clone()),
            project_id: self.project_id.clone(),
            ..Default::default()
        }
    }
}

/// Title a record is persisted under.
pub(crate) fn title_for(metadata: &Metadata) -> &str {
    metadata.label().unwrap_or("Untitled")
}

/// Durable create and bulk read of indexed documents.
///
/// Callers treat every error as a warning; in-memory state never depends on it.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    async fn create(&self, document: StoredDocument) -> AppResult<()>;

    /// Up to `limit` of the most recently created documents, oldest first.
    async fn list_indexed(&self, limit: usize) -> AppResult<Vec<StoredDocument>>;
}

/// Append-only JSON-lines document store.
#[derive(Debug)]
pub struct JsonlDocumentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `<workspace>/.studio/rag/documents.jsonl`.
    pub fn for_workspace(workspace: &Path) -> Self {
        Self::new(crate::config::documents_path(workspace))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, document: &StoredDocument) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Persistence(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let json_line = serde_json::to_string(document)
            .map_err(|e| AppError::Persistence(format!("Failed to serialize document: {}", e)))?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::Persistence(format!("Failed to open {:?}: {}", self.path, e)))?;

        writeln!(file, "{}", json_line).map_err(|e| {
            AppError::Persistence(format!("Failed to write to {:?}: {}", self.path, e))
        })?;

        file.sync_all()
            .map_err(|e| AppError::Persistence(format!("Failed to sync {:?}: {}", self.path, e)))?;

        Ok(())
    }

    fn read_tail(&self, limit: usize) -> AppResult<Vec<StoredDocument>> {
        if !self.path.exists() || limit == 0 {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| AppError::Persistence(format!("Failed to open {:?}: {}", self.path, e)))?;

        let mut documents = VecDeque::with_capacity(limit);
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                AppError::Persistence(format!("Failed to read line {}: {}", line_num + 1, e))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<StoredDocument>(&line) {
                Ok(document) => {
                    if documents.len() == limit {
                        documents.pop_front();
                    }
                    documents.push_back(document);
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed line {} in {:?}: {}",
                        line_num + 1,
                        self.path,
                        e
                    );
                }
            }
        }

        Ok(documents.into())
    }
}

#[async_trait]
impl DocumentStore for JsonlDocumentStore {
    async fn create(&self, document: StoredDocument) -> AppResult<()> {
        self.append(&document)?;
        tracing::debug!("Persisted document '{}'", document.title);
        Ok(())
    }

    async fn list_indexed(&self, limit: usize) -> AppResult<Vec<StoredDocument>> {
        let documents = self.read_tail(limit)?;
        tracing::debug!("Listed {} documents from {:?}", documents.len(), self.path);
        Ok(documents)
    }
}

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<Vec<StoredDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, document: StoredDocument) -> AppResult<()> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(document);
        Ok(())
    }

    async fn list_indexed(&self, limit: usize) -> AppResult<Vec<StoredDocument>> {
        let documents = self
            .documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let skip = documents.len().saturating_sub(limit);
        Ok(documents[skip..].to_vec())
    }
}
