//! TTL and size-bounded memoization of embedding lookups.
//!
//! Entries are keyed by the exact text. An entry whose age has reached the TTL
//! is never returned; it is treated as absent and regenerated. When the cache is
//! full the oldest-inserted entry is evicted (insertion order, not access order).

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use studio_core::{AppError, AppResult, RagSettings};
use tracing::{debug, warn};

use super::EmbeddingProvider;
use crate::similarity::cosine_similarity;

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_entries: 1000,
        }
    }
}

impl From<&RagSettings> for CacheConfig {
    fn from(settings: &RagSettings) -> Self {
        Self {
            ttl: Duration::from_secs(settings.cache_ttl_secs),
            max_entries: settings.cache_max_entries.max(1),
        }
    }
}

/// Observability snapshot returned by [`EmbeddingCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_secs: u64,
}

/// One ranked result of [`EmbeddingCache::find_similar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarText {
    pub text: String,
    pub score: f32,
    /// Position of the text in the input slice
    pub index: usize,
}

#[derive(Debug)]
struct CachedEmbedding {
    vector: Vec<f32>,
    inserted_at: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CachedEmbedding>,
    /// Insertion sequence -> key, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl CacheInner {
    fn fresh(&self, text: &str, ttl: Duration) -> Option<&Vec<f32>> {
        self.entries
            .get(text)
            .filter(|entry| entry.inserted_at.elapsed() < ttl)
            .map(|entry| &entry.vector)
    }

    fn insert(&mut self, text: &str, vector: Vec<f32>, max_entries: usize) {
        if let Some(previous) = self.entries.remove(text) {
            self.order.remove(&previous.seq);
        } else if self.entries.len() >= max_entries {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.entries.remove(&oldest);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, text.to_string());
        self.entries.insert(
            text.to_string(),
            CachedEmbedding {
                vector,
                inserted_at: Instant::now(),
                seq,
            },
        );
    }
}

/// Memoizing front for an [`EmbeddingProvider`].
///
/// The lock is never held across a provider call, so a slow provider does not
/// block lookups of unrelated keys. Two concurrent misses on the same text may
/// both reach the provider; the later insert wins.
#[derive(Debug)]
pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

impl EmbeddingCache {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: CacheConfig) -> Self {
        Self {
            provider,
            config: CacheConfig {
                max_entries: config.max_entries.max(1),
                ..config
            },
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // The map stays consistent across a panicking holder, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remember(&self, text: &str, vector: Vec<f32>) {
        self.lock().insert(text, vector, self.config.max_entries);
    }

    /// Vector for `text`, from the cache when fresh, otherwise from the provider.
    ///
    /// Provider failures propagate unchanged and nothing is cached.
    pub async fn get(&self, text: &str) -> AppResult<Vec<f32>> {
        if let Some(vector) = self.lock().fresh(text, self.config.ttl).cloned() {
            return Ok(vector);
        }

        let vector = self.provider.embed(text).await?;
        self.remember(text, vector.clone());
        Ok(vector)
    }

    /// Order-preserving batch lookup.
    ///
    /// Fresh entries are served from the cache. The remaining texts are
    /// de-duplicated and sent to the provider in one batched call. If that call
    /// fails, each missing text is requested individually; texts that still fail
    /// come back as empty vectors. The error is returned only when every
    /// individual request failed.
    pub async fn get_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut missing: Vec<String> = Vec::new();
        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();

        {
            let inner = self.lock();
            for (i, text) in texts.iter().enumerate() {
                if let Some(vector) = inner.fresh(text, self.config.ttl) {
                    results[i] = Some(vector.clone());
                    continue;
                }

                let slots = positions.entry(text.as_str()).or_default();
                if slots.is_empty() {
                    missing.push(text.clone());
                }
                slots.push(i);
            }
        }

        debug!(
            "Embedding cache batch: {} hits, {} misses ({} unique)",
            texts.len() - positions.values().map(Vec::len).sum::<usize>(),
            positions.values().map(Vec::len).sum::<usize>(),
            missing.len()
        );

        if !missing.is_empty() {
            let generated = match self.provider.embed_batch(&missing).await {
                Ok(vectors) if vectors.len() == missing.len() => {
                    let mut inner = self.lock();
                    for (text, vector) in missing.iter().zip(&vectors) {
                        inner.insert(text, vector.clone(), self.config.max_entries);
                    }
                    vectors
                }
                Ok(vectors) => {
                    warn!(
                        "Batch embedding returned {} vectors for {} texts, falling back to single requests",
                        vectors.len(),
                        missing.len()
                    );
                    self.fallback(&missing).await?
                }
                Err(e) => {
                    warn!("Batch embedding failed ({}), falling back to single requests", e);
                    self.fallback(&missing).await?
                }
            };

            for (text, vector) in missing.iter().zip(generated) {
                if let Some(slots) = positions.get(text.as_str()) {
                    for &i in slots {
                        results[i] = Some(vector.clone());
                    }
                }
            }
        }

        Ok(results.into_iter().map(Option::unwrap_or_default).collect())
    }

    async fn fallback(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let outcomes = join_all(texts.iter().map(|text| self.get(text))).await;

        let mut vectors = Vec::with_capacity(outcomes.len());
        let mut last_error: Option<AppError> = None;
        let mut failures = 0;

        for (text, outcome) in texts.iter().zip(outcomes) {
            match outcome {
                Ok(vector) => vectors.push(vector),
                Err(e) => {
                    warn!("Embedding failed for text ({} chars): {}", text.len(), e);
                    failures += 1;
                    last_error = Some(e);
                    vectors.push(Vec::new());
                }
            }
        }

        if failures == texts.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(vectors)
    }

    /// Remove every entry whose age has reached the TTL. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let ttl = self.config.ttl;
        let mut inner = self.lock();

        let expired: Vec<(String, u64)> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() >= ttl)
            .map(|(text, entry)| (text.clone(), entry.seq))
            .collect();

        for (text, seq) in &expired {
            inner.entries.remove(text);
            inner.order.remove(seq);
        }

        if !expired.is_empty() {
            debug!("Evicted {} expired embeddings", expired.len());
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.config.max_entries,
            ttl_secs: self.config.ttl.as_secs(),
        }
    }

    /// Rank `documents` by cosine similarity to `query`.
    ///
    /// Blank documents, and documents whose embedding could not be produced,
    /// are skipped. `index` refers to the position in `documents`.
    pub async fn find_similar(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> AppResult<Vec<SimilarText>> {
        let query_vector = self.get(query).await?;

        let candidates: Vec<(usize, &String)> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| !doc.trim().is_empty())
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = candidates.iter().map(|(_, doc)| (*doc).clone()).collect();
        let vectors = self.get_batch(&texts).await?;

        let mut ranked: Vec<SimilarText> = candidates
            .into_iter()
            .zip(vectors)
            .filter(|(_, vector)| !vector.is_empty())
            .map(|((index, text), vector)| SimilarText {
                text: text.clone(),
                score: cosine_similarity(&query_vector, &vector),
                index,
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(top_k);
        Ok(ranked)
    }
}
