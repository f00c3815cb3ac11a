//! Retrieval core type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance tag attached to every indexed chunk.
///
/// Produced by a [`crate::indexer::Classifier`] for source files, or set to
/// [`ChunkKind::Document`] for ad-hoc documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Component,
    Service,
    Controller,
    Schema,
    Config,
    Test,
    Code,
    Document,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Component => "component",
            ChunkKind::Service => "service",
            ChunkKind::Controller => "controller",
            ChunkKind::Schema => "schema",
            ChunkKind::Config => "config",
            ChunkKind::Test => "test",
            ChunkKind::Code => "code",
            ChunkKind::Document => "document",
        }
    }

    /// Parse a persisted tag. Unknown tags yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value.trim().to_ascii_lowercase().as_str() {
            "component" => ChunkKind::Component,
            "service" => ChunkKind::Service,
            "controller" => ChunkKind::Controller,
            "schema" => ChunkKind::Schema,
            "config" => ChunkKind::Config,
            "test" => ChunkKind::Test,
            "code" => ChunkKind::Code,
            "document" | "documentation" => ChunkKind::Document,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed metadata attached to a vector record.
///
/// The key set is closed so that filter predicates stay well-defined:
/// source chunks use `file_path`, `line_start`, `line_end` and `kind`;
/// ad-hoc documents use `title`, `source`, `chunk_index` and `total_chunks`;
/// either may carry a `project_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<usize>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChunkKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
}

impl Metadata {
    /// Metadata for a chunk cut from a source file.
    pub fn for_chunk(chunk: &Chunk, kind: ChunkKind) -> Self {
        Self {
            file_path: Some(chunk.file_path.clone()),
            line_start: Some(chunk.line_start),
            line_end: Some(chunk.line_end),
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ChunkKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    /// Human-readable label: file path, then title, then source.
    pub fn label(&self) -> Option<&str> {
        self.file_path
            .as_deref()
            .or(self.title.as_deref())
            .or(self.source.as_deref())
    }

    /// `lines a-b` when both bounds are known.
    pub fn line_range(&self) -> Option<String> {
        match (self.line_start, self.line_end) {
            (Some(start), Some(end)) => Some(format!("lines {}-{}", start, end)),
            _ => None,
        }
    }
}

/// An embedded piece of content held by the vector store.
///
/// Records are never mutated in place; replacement is delete + re-insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorRecord {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Text that was embedded
    pub content: String,

    /// Embedding vector; empty when the provider could not produce one
    pub embedding: Vec<f32>,

    pub metadata: Metadata,

    pub created_at: DateTime<Utc>,
}

/// Content plus metadata awaiting embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub content: String,
    pub metadata: Metadata,
}

impl NewDocument {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub score: f32,
    pub metadata: Metadata,
}

/// A transient slice of a source file's lines (1-indexed, inclusive bounds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
}

/// Process-wide indexing state as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    /// Number of records currently held by the vector store
    #[serde(rename = "indexed")]
    pub document_count: usize,

    /// Whether an indexing run is active
    pub is_indexing: bool,
}
