//! In-memory vector store with brute-force cosine and hybrid search.
//!
//! Records live in insertion order behind a read-write lock. Searches clone a
//! snapshot of the record handles and score outside the lock, so a record added
//! mid-search is at worst missed, never torn.

pub mod filter;

pub use filter::{HybridSearchOptions, MetadataFilter, SearchOptions};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use studio_core::AppResult;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::docstore::{title_for, DocumentStore, StoredDocument};
use crate::embeddings::EmbeddingCache;
use crate::similarity::{blend, cosine_similarity, is_comparable, keyword_score, query_terms};
use crate::types::{Metadata, NewDocument, SearchHit, VectorRecord};

/// Observability snapshot returned by [`VectorStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub document_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: Vec<Arc<VectorRecord>>,
    last_updated: Option<DateTime<Utc>>,
}

/// Single-collection vector store.
#[derive(Debug)]
pub struct VectorStore {
    cache: Arc<EmbeddingCache>,
    documents: Option<Arc<dyn DocumentStore>>,
    inner: RwLock<StoreInner>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl VectorStore {
    /// Create a store. Without a document store nothing is persisted and
    /// warm-load is a no-op.
    pub fn new(cache: Arc<EmbeddingCache>, documents: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            cache,
            documents,
            inner: RwLock::new(StoreInner::default()),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Embed `content`, insert it, and persist a summary in the background.
    pub async fn store(&self, content: &str, metadata: Metadata) -> AppResult<String> {
        let embedding = self.cache.get(content).await?;
        let record = Arc::new(new_record(content.to_string(), embedding, metadata));
        let id = record.id.clone();

        self.insert(vec![record.clone()]);
        self.persist(vec![record]);

        debug!("Stored document {}", id);
        Ok(id)
    }

    /// Embed every document with one batched lookup, then insert them all.
    ///
    /// Only the embedding step can fail; insertion is infallible.
    pub async fn store_batch(&self, documents: Vec<NewDocument>) -> AppResult<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.cache.get_batch(&texts).await?;

        let records: Vec<Arc<VectorRecord>> = documents
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| Arc::new(new_record(doc.content, embedding, doc.metadata)))
            .collect();
        let ids = records.iter().map(|r| r.id.clone()).collect();

        self.insert(records.clone());
        self.persist(records);

        Ok(ids)
    }

    fn insert(&self, records: Vec<Arc<VectorRecord>>) {
        let mut inner = self.write();
        inner.records.extend(records);
        inner.last_updated = Some(Utc::now());
    }

    /// Best-effort, detached write of record summaries.
    fn persist(&self, records: Vec<Arc<VectorRecord>>) {
        let Some(documents) = self.documents.clone() else {
            return;
        };

        let handle = tokio::spawn(async move {
            for record in records {
                if let Err(e) = documents.create(StoredDocument::from_record(&record)).await {
                    warn!("Failed to persist document {}: {}", record.id, e);
                }
            }
        });

        let mut pending = self
            .pending_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every background persistence write issued so far.
    ///
    /// Short-lived callers use this before exiting so summaries reach disk.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self
                .pending_writes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pending.drain(..).collect()
        };

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Persistence task failed: {}", e);
            }
        }
    }

    fn snapshot(&self, filter: Option<&MetadataFilter>) -> Vec<Arc<VectorRecord>> {
        let inner = self.read();
        match filter {
            Some(filter) if filter.has_filters() => inner
                .records
                .iter()
                .filter(|r| filter.matches(&r.metadata))
                .cloned()
                .collect(),
            _ => inner.records.clone(),
        }
    }

    /// Cosine top-K search.
    ///
    /// Records with an empty embedding, or one whose length differs from the
    /// query's, are excluded. Ties keep insertion order.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> AppResult<Vec<SearchHit>> {
        let query_embedding = self.cache.get(query).await?;
        let candidates = self.snapshot(options.filter.as_ref());

        let mut hits: Vec<SearchHit> = candidates
            .iter()
            .filter(|r| is_comparable(&query_embedding, &r.embedding))
            .map(|r| to_hit(r, cosine_similarity(&query_embedding, &r.embedding)))
            .filter(|hit| options.threshold.map_or(true, |t| hit.score >= t))
            .collect();

        rank(&mut hits, options.top_k);
        Ok(hits)
    }

    /// Search blending cosine similarity with keyword overlap.
    ///
    /// `score = w * semantic + (1 - w) * keyword`, where keyword is the fraction
    /// of query terms (three or more characters) found in the content.
    pub async fn hybrid_search(
        &self,
        query: &str,
        options: &HybridSearchOptions,
    ) -> AppResult<Vec<SearchHit>> {
        let query_embedding = self.cache.get(query).await?;
        let terms = query_terms(query);
        let candidates = self.snapshot(options.filter.as_ref());

        let mut hits: Vec<SearchHit> = candidates
            .iter()
            .filter(|r| is_comparable(&query_embedding, &r.embedding))
            .map(|r| {
                let semantic = cosine_similarity(&query_embedding, &r.embedding);
                let keyword = keyword_score(&terms, &r.content);
                to_hit(r, blend(semantic, keyword, options.semantic_weight))
            })
            .collect();

        rank(&mut hits, options.top_k);
        Ok(hits)
    }

    pub fn delete(&self, id: &str) -> bool {
        let mut inner = self.write();
        let before = inner.records.len();
        inner.records.retain(|r| r.id != id);
        let removed = inner.records.len() != before;
        if removed {
            inner.last_updated = Some(Utc::now());
        }
        removed
    }

    pub fn clear(&self) {
        let mut inner = self.write();
        inner.records.clear();
        inner.last_updated = Some(Utc::now());
        info!("Vector store cleared");
    }

    pub fn get(&self, id: &str) -> Option<Arc<VectorRecord>> {
        self.read().records.iter().find(|r| r.id == id).cloned()
    }

    pub fn get_content(&self, id: &str) -> Option<String> {
        self.get(id).map(|r| r.content.clone())
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.read();
        StoreStats {
            document_count: inner.records.len(),
            last_updated: inner.last_updated,
        }
    }

    /// Re-embed up to `limit` persisted documents in one batch and insert them.
    ///
    /// Loaded documents are not persisted again. The document store is
    /// append-only, so repeated index runs leave copies behind: a document whose
    /// (title, content) pair is already in memory, or appeared earlier in the
    /// listing, is skipped. Returns how many were loaded.
    pub async fn warm_load(&self, limit: usize) -> AppResult<usize> {
        let Some(store) = &self.documents else {
            return Ok(0);
        };

        let mut seen: HashSet<(String, String)> = self
            .read()
            .records
            .iter()
            .map(|r| (title_for(&r.metadata).to_string(), r.content.clone()))
            .collect();

        let listed = store.list_indexed(limit).await?;
        let listed_count = listed.len();
        let stored: Vec<StoredDocument> = listed
            .into_iter()
            .filter(|d| !d.content.trim().is_empty())
            .filter(|d| seen.insert((d.title.clone(), d.content.clone())))
            .collect();
        if stored.len() < listed_count {
            debug!("Warm-load skipped {} empty or duplicate documents", listed_count - stored.len());
        }
        if stored.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = stored.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.cache.get_batch(&texts).await?;

        let records: Vec<Arc<VectorRecord>> = stored
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| {
                let metadata = doc.metadata();
                Arc::new(VectorRecord {
                    id: Uuid::new_v4().to_string(),
                    content: doc.content,
                    embedding,
                    metadata,
                    created_at: doc.created_at,
                })
            })
            .collect();

        let loaded = records.len();
        self.insert(records);
        Ok(loaded)
    }

    /// Run [`warm_load`](Self::warm_load) as a detached task.
    ///
    /// Failures are logged; the caller never waits on this.
    pub fn spawn_warm_load(self: &Arc<Self>, limit: usize) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            info!("Warm-loading up to {} documents", limit);
            match store.warm_load(limit).await {
                Ok(loaded) => info!("Warm-load finished: {} documents", loaded),
                Err(e) => warn!("Warm-load failed: {}", e),
            }
        })
    }
}

fn new_record(content: String, embedding: Vec<f32>, metadata: Metadata) -> VectorRecord {
    VectorRecord {
        id: Uuid::new_v4().to_string(),
        content,
        embedding,
        metadata,
        created_at: Utc::now(),
    }
}

fn to_hit(record: &VectorRecord, score: f32) -> SearchHit {
    SearchHit {
        id: record.id.clone(),
        content: record.content.clone(),
        score,
        metadata: record.metadata.clone(),
    }
}

/// Stable sort by descending score, then keep the first `top_k`.
fn rank(hits: &mut Vec<SearchHit>, top_k: usize) {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(top_k);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docstore::MemoryDocumentStore;
    use crate::embeddings::CacheConfig;
    use crate::testing::{wait_until, FailingDocumentStore, ScriptedProvider};
    use crate::types::ChunkKind;
    use std::sync::atomic::Ordering;

    fn geometric_provider() -> ScriptedProvider {
        ScriptedProvider::new(3)
            .with_vector("query", vec![1.0, 0.0, 0.0])
            .with_vector("identical", vec![1.0, 0.0, 0.0])
            .with_vector("near", vec![0.8, 0.2, 0.0])
            .with_vector("orthogonal", vec![0.0, 0.0, 1.0])
            .with_vector("short", vec![1.0, 0.0])
    }

    fn store_with(provider: ScriptedProvider, documents: Option<Arc<dyn DocumentStore>>) -> VectorStore {
        let cache = EmbeddingCache::new(Arc::new(provider), CacheConfig::default());
        VectorStore::new(Arc::new(cache), documents)
    }

    fn docs(texts: &[&str]) -> Vec<NewDocument> {
        texts
            .iter()
            .map(|t| NewDocument::new(*t, Metadata::default()))
            .collect()
    }

    #[tokio::test]
    async fn test_search_ranks_identical_first() {
        let store = store_with(geometric_provider(), None);
        store
            .store_batch(docs(&["orthogonal", "near", "identical"]))
            .await
            .unwrap();

        let hits = store.search("query", &SearchOptions::top_k(2)).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "identical");
        assert_eq!(hits[1].content, "near");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_search_excludes_empty_and_mismatched_embeddings() {
        let provider = geometric_provider().with_failing_batches().fail_on("broken");
        let store = store_with(provider, None);

        store
            .store_batch(docs(&["identical", "broken", "short", "orthogonal"]))
            .await
            .unwrap();
        assert_eq!(store.len(), 4);

        let hits = store.search("query", &SearchOptions::top_k(10)).await.unwrap();
        let contents: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["identical", "orthogonal"]);

        let hybrid = store
            .hybrid_search("query", &HybridSearchOptions::top_k(10))
            .await
            .unwrap();
        assert_eq!(hybrid.len(), 2);
    }

    #[tokio::test]
    async fn test_search_applies_threshold_and_filter() {
        let store = store_with(geometric_provider(), None);
        store
            .store("identical", Metadata::default().with_kind(ChunkKind::Service))
            .await
            .unwrap();
        store
            .store("near", Metadata::default().with_kind(ChunkKind::Controller))
            .await
            .unwrap();
        store.store("orthogonal", Metadata::default()).await.unwrap();

        let above = store
            .search("query", &SearchOptions::top_k(10).with_threshold(0.5))
            .await
            .unwrap();
        assert_eq!(above.len(), 2);

        let controllers = store
            .search(
                "query",
                &SearchOptions::top_k(10).with_filter(MetadataFilter::new().with_kind(ChunkKind::Controller)),
            )
            .await
            .unwrap();
        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers[0].content, "near");
    }

    #[tokio::test]
    async fn test_hybrid_weight_extremes() {
        let provider = ScriptedProvider::new(3)
            .with_vector("invoice approval", vec![1.0, 0.0, 0.0])
            .with_vector("semantic twin", vec![1.0, 0.0, 0.0])
            .with_vector("approval of every invoice", vec![0.0, 1.0, 0.0]);
        let store = store_with(provider, None);
        store
            .store_batch(docs(&["semantic twin", "approval of every invoice"]))
            .await
            .unwrap();

        let semantic = store
            .hybrid_search("invoice approval", &HybridSearchOptions::top_k(2).with_semantic_weight(1.0))
            .await
            .unwrap();
        assert_eq!(semantic[0].content, "semantic twin");
        assert!((semantic[0].score - 1.0).abs() < 1e-6);

        let keyword = store
            .hybrid_search("invoice approval", &HybridSearchOptions::top_k(2).with_semantic_weight(0.0))
            .await
            .unwrap();
        assert_eq!(keyword[0].content, "approval of every invoice");
        assert!((keyword[0].score - 1.0).abs() < 1e-6);
        assert_eq!(keyword[1].score, 0.0);
    }

    #[tokio::test]
    async fn test_hybrid_ties_keep_insertion_order() {
        let provider = ScriptedProvider::new(3)
            .with_vector("budget", vec![1.0, 0.0, 0.0])
            .with_vector("first budget note", vec![0.0, 1.0, 0.0])
            .with_vector("second budget note", vec![0.0, 0.0, 1.0]);
        let store = store_with(provider, None);
        store
            .store_batch(docs(&["first budget note", "second budget note"]))
            .await
            .unwrap();

        let hits = store
            .hybrid_search("budget", &HybridSearchOptions::top_k(2).with_semantic_weight(0.0))
            .await
            .unwrap();
        assert_eq!(hits[0].content, "first budget note");
        assert_eq!(hits[1].content, "second budget note");
    }

    #[tokio::test]
    async fn test_delete_clear_and_get_content() {
        let store = store_with(geometric_provider(), None);
        let ids = store.store_batch(docs(&["identical", "near"])).await.unwrap();

        assert_eq!(store.get_content(&ids[0]).as_deref(), Some("identical"));
        assert!(store.delete(&ids[0]));
        assert!(!store.delete(&ids[0]));
        assert_eq!(store.get_content(&ids[0]), None);
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.stats().document_count, 0);
        assert!(store.stats().last_updated.is_some());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_fatal() {
        let failing = Arc::new(FailingDocumentStore::default());
        let store = store_with(geometric_provider(), Some(failing.clone()));

        let id = store.store("identical", Metadata::default()).await.unwrap();

        wait_until(|| failing.create_attempts.load(Ordering::SeqCst) == 1).await;
        assert_eq!(store.get_content(&id).as_deref(), Some("identical"));
    }

    #[tokio::test]
    async fn test_flush_waits_for_background_writes() {
        let documents = Arc::new(MemoryDocumentStore::new());
        let store = store_with(geometric_provider(), Some(documents.clone()));

        store
            .store_batch(docs(&["identical", "near"]))
            .await
            .unwrap();
        store.store("orthogonal", Metadata::default()).await.unwrap();
        store.flush().await;

        assert_eq!(documents.len(), 3);
    }

    #[tokio::test]
    async fn test_warm_load_restores_persisted_documents() {
        let documents = Arc::new(MemoryDocumentStore::new());
        let writer = store_with(ScriptedProvider::new(16), Some(documents.clone()));
        writer
            .store(
                "Freelancers are assigned to projects by the studio manager",
                Metadata::default().with_title("Assignments").with_project("p1"),
            )
            .await
            .unwrap();
        wait_until(|| documents.len() == 1).await;

        let reader = store_with(ScriptedProvider::new(16), Some(documents.clone()));
        assert_eq!(reader.warm_load(10).await.unwrap(), 1);

        let hits = reader
            .search("freelancer assignment", &SearchOptions::top_k(1))
            .await
            .unwrap();
        assert_eq!(hits[0].metadata.title.as_deref(), Some("Assignments"));
        assert_eq!(hits[0].metadata.project_id.as_deref(), Some("p1"));

        // Warm-loaded records are not written back
        tokio::task::yield_now().await;
        assert_eq!(documents.len(), 1);
    }

    #[tokio::test]
    async fn test_warm_load_skips_repeated_documents() {
        const NOTE: &str = "Invoices are generated when a milestone is approved";
        let documents = Arc::new(MemoryDocumentStore::new());
        let writer = store_with(ScriptedProvider::new(16), Some(documents.clone()));
        // Same document indexed twice, plus the same text under another title
        for title in ["Billing", "Billing", "Milestones"] {
            writer
                .store(NOTE, Metadata::default().with_title(title))
                .await
                .unwrap();
        }
        writer.flush().await;
        assert_eq!(documents.len(), 3);

        let reader = store_with(ScriptedProvider::new(16), Some(documents.clone()));
        assert_eq!(reader.warm_load(10).await.unwrap(), 2);
        assert_eq!(reader.len(), 2);

        // Records already in memory are not loaded again
        assert_eq!(reader.warm_load(10).await.unwrap(), 0);
        assert_eq!(reader.len(), 2);
    }

    #[tokio::test]
    async fn test_spawned_warm_load_survives_store_failure() {
        let store = Arc::new(store_with(
            ScriptedProvider::new(16),
            Some(Arc::new(FailingDocumentStore::default())),
        ));

        store.spawn_warm_load(10).await.unwrap();
        assert!(store.is_empty());
    }
}
