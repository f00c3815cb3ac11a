//! Embedding generation and memoization.
//!
//! Every text-to-vector lookup in the retrieval core goes through an
//! [`EmbeddingCache`], which in turn depends only on the two-method
//! [`EmbeddingProvider`] contract.

pub mod cache;
pub mod provider;
pub mod providers;

pub use cache::{CacheConfig, CacheStats, EmbeddingCache, SimilarText};
pub use provider::{create_provider, EmbeddingProvider};
