//! Metadata filters and search options.

use serde::{Deserialize, Serialize};

use crate::types::{ChunkKind, Metadata};

/// Exact-match metadata predicate.
///
/// A record matches when every key that is set here is equal on the record.
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFilter {
    pub file_path: Option<String>,
    pub line_start: Option<usize>,
    pub line_end: Option<usize>,
    #[serde(rename = "type")]
    pub kind: Option<ChunkKind>,
    pub project_id: Option<String>,
    pub title: Option<String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
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

    /// Check if any predicate is set
    pub fn has_filters(&self) -> bool {
        self.file_path.is_some()
            || self.line_start.is_some()
            || self.line_end.is_some()
            || self.kind.is_some()
            || self.project_id.is_some()
            || self.title.is_some()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        fn eq<T: PartialEq>(wanted: &Option<T>, actual: &Option<T>) -> bool {
            match wanted {
                Some(value) => actual.as_ref() == Some(value),
                None => true,
            }
        }

        eq(&self.file_path, &metadata.file_path)
            && eq(&self.line_start, &metadata.line_start)
            && eq(&self.line_end, &metadata.line_end)
            && eq(&self.kind, &metadata.kind)
            && eq(&self.project_id, &metadata.project_id)
            && eq(&self.title, &metadata.title)
    }
}

/// Options for [`super::VectorStore::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Hits scoring below this are discarded
    pub threshold: Option<f32>,
    pub filter: Option<MetadataFilter>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: None,
            filter: None,
        }
    }
}

impl SearchOptions {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Options for [`super::VectorStore::hybrid_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct HybridSearchOptions {
    pub top_k: usize,
    /// Weight of the cosine score; the keyword score gets the remainder
    pub semantic_weight: f32,
    pub filter: Option<MetadataFilter>,
}

impl Default for HybridSearchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            semantic_weight: 0.7,
            filter: None,
        }
    }
}

impl HybridSearchOptions {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }

    pub fn with_semantic_weight(mut self, semantic_weight: f32) -> Self {
        self.semantic_weight = semantic_weight.clamp(0.0, 1.0);
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}
