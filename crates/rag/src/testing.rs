//! Test doubles shared by unit and scenario tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use studio_core::{AppError, AppResult};
use tokio::sync::Semaphore;

use crate::docstore::{DocumentStore, StoredDocument};
use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;

/// Counting, scriptable embedding provider.
///
/// Texts without a scripted vector are embedded with the trigram backend.
#[derive(Debug)]
pub(crate) struct ScriptedProvider {
    fallback: TrigramProvider,
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
    failing_texts: HashSet<String>,
    fail_batches: bool,
    short_batches: bool,
    gate: Option<Arc<Semaphore>>,
    single_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    batch_inputs: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self {
            fallback: TrigramProvider::new(dimensions),
            dimensions,
            vectors: HashMap::new(),
            failing_texts: HashSet::new(),
            fail_batches: false,
            short_batches: false,
            gate: None,
            single_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            batch_inputs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Any request containing `text` fails.
    pub(crate) fn fail_on(mut self, text: &str) -> Self {
        self.failing_texts.insert(text.to_string());
        self
    }

    pub(crate) fn with_failing_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    /// Batched calls return one vector too few.
    pub(crate) fn with_short_batches(mut self) -> Self {
        self.short_batches = true;
        self
    }

    /// Batched calls wait for a permit from `gate` before answering.
    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn batch_inputs(&self) -> Vec<Vec<String>> {
        self.batch_inputs.lock().unwrap().clone()
    }

    async fn vector_for(&self, text: &str) -> AppResult<Vec<f32>> {
        if self.failing_texts.contains(text) {
            return Err(AppError::Provider(format!("scripted failure for '{}'", text)));
        }
        match self.vectors.get(text) {
            Some(vector) => Ok(vector.clone()),
            None => self.fallback.embed(text).await,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.vector_for(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| AppError::Provider(e.to_string()))?;
        }

        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.batch_inputs.lock().unwrap().push(texts.to_vec());

        if self.fail_batches {
            return Err(AppError::Provider("scripted batch failure".to_string()));
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.vector_for(text).await?);
        }
        if self.short_batches {
            vectors.pop();
        }
        Ok(vectors)
    }
}

/// Document store whose every call fails.
#[derive(Debug, Default)]
pub(crate) struct FailingDocumentStore {
    pub(crate) create_attempts: AtomicUsize,
}

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn create(&self, _document: StoredDocument) -> AppResult<()> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Persistence("document store unavailable".to_string()))
    }

    async fn list_indexed(&self, _limit: usize) -> AppResult<Vec<StoredDocument>> {
        Err(AppError::Persistence("document store unavailable".to_string()))
    }
}

/// Poll `condition` until it holds, yielding to other tasks in between.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
