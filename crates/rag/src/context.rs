//! Renders search hits into a bounded, annotated context block for prompts.

use std::sync::Arc;
use studio_core::{AppResult, RagSettings};

use crate::store::{SearchOptions, VectorStore};
use crate::types::SearchHit;

/// Returned instead of an empty string when no hit survives the search.
pub const NO_CONTEXT: &str = "No relevant context found.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextConfig {
    /// Upper bound on the rendered context, in characters
    pub max_chars: usize,
    /// Hits scoring below this are not included. `None` keeps every hit.
    pub min_relevance: Option<f32>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: 6000,
            min_relevance: None,
        }
    }
}

impl From<&RagSettings> for ContextConfig {
    fn from(settings: &RagSettings) -> Self {
        Self {
            max_chars: settings.max_context_chars,
            min_relevance: settings.min_relevance,
        }
    }
}

/// Turns a query into a prompt-ready context block.
///
/// With a relevance floor configured, [`NO_CONTEXT`] is also returned when hits
/// exist but all of them score below the floor.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    store: Arc<VectorStore>,
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(store: Arc<VectorStore>, config: ContextConfig) -> Self {
        Self { store, config }
    }

    /// Search the store and render the top hits, or [`NO_CONTEXT`].
    pub async fn retrieve_context(&self, query: &str, top_k: usize) -> AppResult<String> {
        let mut options = SearchOptions::top_k(top_k);
        if let Some(floor) = self.config.min_relevance {
            options = options.with_threshold(floor);
        }
        let hits = self.store.search(query, &options).await?;

        tracing::debug!("Assembling context from {} hits", hits.len());
        Ok(render(&hits, self.config.max_chars))
    }
}

/// Numbered, fenced blocks in ranked order, joined by a blank line.
///
/// Blocks that would push the output past `max_chars` are dropped. If even the
/// first block is too large it is truncated on a char boundary.
pub fn render(hits: &[SearchHit], max_chars: usize) -> String {
    let mut output = String::new();
    let mut used = 0;

    for (i, hit) in hits.iter().enumerate() {
        let block = render_block(i + 1, hit);
        let separator = if output.is_empty() { 0 } else { 2 };
        let block_chars = block.chars().count();

        if used + separator + block_chars <= max_chars {
            if separator > 0 {
                output.push_str("\n\n");
            }
            output.push_str(&block);
            used += separator + block_chars;
        } else if output.is_empty() {
            output = block.chars().take(max_chars).collect();
            used = max_chars;
        }
    }

    if output.trim().is_empty() {
        NO_CONTEXT.to_string()
    } else {
        output
    }
}

fn render_block(position: usize, hit: &SearchHit) -> String {
    let metadata = &hit.metadata;
    let mut details = Vec::new();

    if let Some(range) = metadata.line_range() {
        details.push(range);
    }
    if let Some(kind) = metadata.kind {
        details.push(format!("type: {}", kind));
    }
    details.push(format!("score: {:.3}", hit.score));

    format!(
        "[{}] {} ({})\n```\n{}\n```",
        position,
        metadata.label().unwrap_or("untitled"),
        details.join(", "),
        hit.content.trim_end()
    )
}
