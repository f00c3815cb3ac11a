//! Retrieval API request and response types.

use serde::{Deserialize, Serialize};

use crate::embeddings::CacheStats;
use crate::store::StoreStats;
use crate::types::{ChunkKind, Metadata, SearchHit};

/// Caller-supplied metadata for an ad-hoc document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub source: Option<String>,
    pub project_id: Option<String>,
    pub title: Option<String>,
    /// Defaults to [`ChunkKind::Document`]
    #[serde(rename = "type")]
    pub kind: Option<ChunkKind>,
}

impl DocumentMetadata {
    pub(crate) fn for_chunk(&self, chunk_index: usize, total_chunks: usize) -> Metadata {
        Metadata {
            kind: Some(self.kind.unwrap_or(ChunkKind::Document)),
            project_id: self.project_id.clone(),
            title: self.title.clone(),
            source: self.source.clone(),
            chunk_index: Some(chunk_index),
            total_chunks: Some(total_chunks),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocumentResult {
    pub chunks_indexed: usize,
    pub document_ids: Vec<String>,
}

/// Options for [`super::RagService::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Restrict the search to one project
    pub project_id: Option<String>,
    pub top_k: usize,
    /// Attach the rendered [`RagContext`] to the response
    pub include_context: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            project_id: None,
            top_k: 5,
            include_context: true,
        }
    }
}

/// Where a piece of the answer context came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub content: String,
    pub score: f32,
    pub metadata: Metadata,
}

impl From<&SearchHit> for SourceRef {
    fn from(hit: &SearchHit) -> Self {
        Self {
            content: hit.content.clone(),
            score: hit.score,
            metadata: hit.metadata.clone(),
        }
    }
}

/// Retrieved chunks plus the context text handed to the chat component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagContext {
    pub query: String,
    pub relevant_chunks: Vec<SearchHit>,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub sources: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RagContext>,
    /// 0.0 - 1.0, derived from hit scores and hit count
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagStats {
    pub vector_store: StoreStats,
    pub embeddings_cache: CacheStats,
}

/// `min(mean score + min(0.1 * n, 0.3), 1.0)`, or `0.0` without hits.
pub fn confidence(hits: &[SearchHit]) -> f32 {
    if hits.is_empty() {
        return 0.0;
    }

    let avg = hits.iter().map(|h| h.score).sum::<f32>() / hits.len() as f32;
    let count_bonus = (hits.len() as f32 * 0.1).min(0.3);
    (avg + count_bonus).min(1.0)
}

/// `[Source i] (Relevance: x.x%)` blocks separated by `---` lines.
pub fn source_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[Source {}] (Relevance: {:.1}%)\n{}\n",
                i + 1,
                hit.score * 100.0,
                hit.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}
