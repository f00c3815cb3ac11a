//! Retrieval service: the API surface consumed by the chat and analyst components.
//!
//! Owns the embedding cache, vector store, indexing state and context assembler
//! for one process. Construct it once at startup and share it behind an `Arc`.

pub mod types;

pub use types::{
    DocumentMetadata, IndexDocumentResult, QueryOptions, QueryResponse, RagContext, RagStats,
    SourceRef,
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use studio_core::{AppConfig, AppResult, RagSettings};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chunker::chunk_paragraphs;
use crate::context::{ContextAssembler, ContextConfig};
use crate::docstore::{DocumentStore, JsonlDocumentStore};
use crate::embeddings::{create_provider, CacheConfig, EmbeddingCache, EmbeddingProvider};
use crate::indexer::{IndexRunReport, IndexState, Indexer, IndexerConfig};
use crate::progress::ProgressReporter;
use crate::store::{HybridSearchOptions, MetadataFilter, VectorStore};
use crate::types::{IndexStatus, NewDocument};

#[derive(Debug)]
pub struct RagService {
    settings: RagSettings,
    cache: Arc<EmbeddingCache>,
    store: Arc<VectorStore>,
    state: Arc<IndexState>,
    indexer: Arc<Indexer>,
    assembler: ContextAssembler,
}

impl RagService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        documents: Option<Arc<dyn DocumentStore>>,
        settings: RagSettings,
    ) -> Self {
        let cache = Arc::new(EmbeddingCache::new(provider, CacheConfig::from(&settings)));
        let store = Arc::new(VectorStore::new(cache.clone(), documents));
        let state = Arc::new(IndexState::new());
        let indexer = Arc::new(Indexer::new(
            store.clone(),
            state.clone(),
            IndexerConfig::from(&settings),
        ));
        let assembler = ContextAssembler::new(store.clone(), ContextConfig::from(&settings));

        Self {
            settings,
            cache,
            store,
            state,
            indexer,
            assembler,
        }
    }

    /// Build the provider named in `config` and persist to the workspace JSONL store.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let provider = create_provider(&config.embedding).await?;
        info!(
            "Using embedding provider '{}' (model: {}, dimensions: {})",
            provider.provider_name(),
            provider.model_name(),
            provider.dimensions()
        );

        let documents: Arc<dyn DocumentStore> =
            Arc::new(JsonlDocumentStore::for_workspace(&config.workspace));

        Ok(Self::new(provider, Some(documents), config.rag.clone()))
    }

    /// Report indexing progress through `progress`.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.indexer = Arc::new(
            Indexer::new(
                self.store.clone(),
                self.state.clone(),
                IndexerConfig::from(&self.settings),
            )
            .with_progress(progress),
        );
        self
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// Split `content` into paragraph chunks and store them all.
    pub async fn index_document(
        &self,
        content: &str,
        metadata: DocumentMetadata,
    ) -> AppResult<IndexDocumentResult> {
        info!(
            "Indexing document: {}",
            metadata.title.as_deref().unwrap_or("Untitled")
        );

        let chunks = chunk_paragraphs(content, self.settings.document_max_chunk_chars);
        let total = chunks.len();

        let documents: Vec<NewDocument> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| NewDocument::new(chunk, metadata.for_chunk(i, total)))
            .collect();

        let document_ids = self.store.store_batch(documents).await?;

        info!("Indexed {} chunks for document", total);
        Ok(IndexDocumentResult {
            chunks_indexed: total,
            document_ids,
        })
    }

    /// Hybrid search, optionally scoped to a project, with sources, context and
    /// a confidence estimate. No answer is generated here.
    pub async fn query(&self, question: &str, options: QueryOptions) -> AppResult<QueryResponse> {
        info!("RAG query: \"{}\"", question);

        let mut search = HybridSearchOptions::top_k(options.top_k)
            .with_semantic_weight(self.settings.semantic_weight);
        if let Some(project_id) = &options.project_id {
            search = search.with_filter(MetadataFilter::new().with_project(project_id.clone()));
        }

        let hits = self.store.hybrid_search(question, &search).await?;
        if hits.is_empty() {
            info!("No relevant documents found");
        }

        let context = options.include_context.then(|| RagContext {
            query: question.to_string(),
            context: types::source_context(&hits),
            relevant_chunks: hits.clone(),
        });

        Ok(QueryResponse {
            sources: hits.iter().map(SourceRef::from).collect(),
            confidence: types::confidence(&hits),
            context,
        })
    }

    pub async fn retrieve_context(&self, query: &str, top_k: usize) -> AppResult<String> {
        self.assembler.retrieve_context(query, top_k).await
    }

    pub fn index_status(&self) -> IndexStatus {
        IndexStatus {
            document_count: self.store.len(),
            is_indexing: self.state.is_indexing(),
        }
    }

    /// Run the indexing pipeline and wait for it. `None` if a run is active.
    pub async fn index_codebase(&self, roots: &[PathBuf]) -> Option<IndexRunReport> {
        self.indexer.run(roots).await
    }

    /// Start an indexing run in the background.
    ///
    /// Returns `false` without starting anything when a run is already active.
    pub fn start_indexing(&self, roots: Vec<PathBuf>) -> bool {
        let Some(guard) = self.state.try_begin() else {
            info!("Indexing already in progress, ignoring request");
            return false;
        };

        let indexer = Arc::clone(&self.indexer);
        tokio::spawn(async move {
            indexer.run_claimed(guard, &roots).await;
        });
        true
    }

    pub fn stats(&self) -> RagStats {
        RagStats {
            vector_store: self.store.stats(),
            embeddings_cache: self.cache.stats(),
        }
    }

    /// Wait for pending document store writes.
    pub async fn flush(&self) {
        self.store.flush().await;
    }

    /// Detached warm-load, when enabled in settings.
    pub fn spawn_warm_load(&self) -> Option<JoinHandle<()>> {
        if !self.settings.warm_load {
            debug!("Warm-load disabled");
            return None;
        }
        Some(self.store.spawn_warm_load(self.settings.warm_load_limit))
    }

    /// Evict expired cache entries every `period` until the handle is aborted.
    pub fn spawn_cache_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
            loop {
                interval.tick().await;
                cache.evict_expired();
            }
        })
    }
}
