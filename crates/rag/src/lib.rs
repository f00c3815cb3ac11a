//! Retrieval core for the studio workspace.
//!
//! Turns a source tree and ad-hoc documents into searchable, embedded chunks:
//! - [`embeddings`]: provider contract, backends, and the TTL/size-bounded cache
//! - [`store`]: in-memory vector store with cosine and hybrid search
//! - [`docstore`]: durable summaries used for warm-load
//! - [`indexer`]: scan, chunk, classify and embed source files
//! - [`context`]: bounded context blocks for prompt construction
//! - [`service`]: the retrieval API tying it all together

pub mod chunker;
pub mod config;
pub mod context;
pub mod docstore;
pub mod embeddings;
pub mod indexer;
pub mod progress;
pub mod service;
pub mod similarity;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use context::{ContextAssembler, ContextConfig, NO_CONTEXT};
pub use docstore::{DocumentStore, JsonlDocumentStore, MemoryDocumentStore, StoredDocument};
pub use embeddings::{create_provider, CacheConfig, CacheStats, EmbeddingCache, EmbeddingProvider};
pub use indexer::{Classifier, IndexRunReport, IndexState, Indexer, IndexerConfig, PathClassifier};
pub use progress::{ProgressEvent, ProgressReporter};
pub use service::{
    DocumentMetadata, IndexDocumentResult, QueryOptions, QueryResponse, RagContext, RagService,
    RagStats, SourceRef,
};
pub use store::{HybridSearchOptions, MetadataFilter, SearchOptions, StoreStats, VectorStore};
pub use types::{ChunkKind, IndexStatus, Metadata, NewDocument, SearchHit, VectorRecord};
