//! Indexing pipeline: scan a source tree, chunk each file, embed, store.
//!
//! A run moves `Idle -> Scanning -> Chunking+Embedding -> Idle`. At most one run
//! is active per [`IndexState`]; a second trigger while a run is active is
//! logged and ignored. Files are processed in fixed-size concurrent batches and
//! a failing file never aborts its batch or the run.

pub mod classify;
pub mod scan;

pub use classify::{Classifier, PathClassifier};
pub use scan::{scan, ScanConfig, SourceFile};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use studio_core::{AppError, AppResult, RagSettings};
use tracing::{debug, info, warn};

use crate::chunker::{chunk_lines, ChunkParams};
use crate::progress::ProgressReporter;
use crate::store::VectorStore;
use crate::types::{Metadata, NewDocument};

/// Explicit, shared indexing state.
#[derive(Debug, Default)]
pub struct IndexState {
    is_indexing: AtomicBool,
}

impl IndexState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_indexing(&self) -> bool {
        self.is_indexing.load(Ordering::SeqCst)
    }

    /// Claim the run gate. `None` when a run is already active.
    pub fn try_begin(self: &Arc<Self>) -> Option<IndexGuard> {
        self.is_indexing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| IndexGuard {
                state: Arc::clone(self),
            })
    }
}

/// Holds the run gate; releases it when dropped.
#[derive(Debug)]
pub struct IndexGuard {
    state: Arc<IndexState>,
}

impl Drop for IndexGuard {
    fn drop(&mut self) {
        self.state.is_indexing.store(false, Ordering::SeqCst);
    }
}

/// Indexer tuning.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub chunk: ChunkParams,
    /// Files with fewer lines are skipped
    pub min_file_lines: usize,
    /// Files processed concurrently per batch
    pub concurrency: usize,
    pub scan: ScanConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkParams::default(),
            min_file_lines: 5,
            concurrency: 5,
            scan: ScanConfig::default(),
        }
    }
}

impl From<&RagSettings> for IndexerConfig {
    fn from(settings: &RagSettings) -> Self {
        Self {
            chunk: ChunkParams::from(settings),
            min_file_lines: settings.min_file_lines,
            concurrency: settings.index_concurrency.max(1),
            scan: ScanConfig::default(),
        }
    }
}

/// Outcome of one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRunReport {
    pub files_scanned: usize,
    pub files_indexed: usize,
    /// Files too short, or with no chunk above the size threshold
    pub files_skipped: usize,
    pub files_failed: usize,
    pub chunks_indexed: usize,
    pub duration_secs: f64,
}

/// Turns source files into vector records.
pub struct Indexer {
    store: Arc<VectorStore>,
    state: Arc<IndexState>,
    classifier: Arc<dyn Classifier>,
    config: IndexerConfig,
    progress: ProgressReporter,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("config", &self.config)
            .field("is_indexing", &self.state.is_indexing())
            .finish()
    }
}

impl Indexer {
    pub fn new(store: Arc<VectorStore>, state: Arc<IndexState>, config: IndexerConfig) -> Self {
        Self {
            store,
            state,
            classifier: Arc::new(PathClassifier),
            config,
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> &Arc<IndexState> {
        &self.state
    }

    /// Read, chunk, classify and store one file. Returns the number of chunks
    /// stored; `0` means the file was skipped.
    ///
    /// Classification and the stored `file_path` use the root-relative path,
    /// so directories above the scanned root never affect the tag.
    ///
    /// # Errors
    /// * `AppError::Indexing` - the file could not be read (including invalid
    ///   UTF-8) or its chunks could not be embedded
    pub async fn index_file(&self, file: &SourceFile) -> AppResult<usize> {
        let path = &file.path;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Indexing(format!("Failed to read {:?}: {}", path, e)))?;

        let lines: Vec<&str> = content.lines().collect();
        if lines.len() < self.config.min_file_lines {
            debug!("Skipping {:?}: {} lines", path, lines.len());
            return Ok(0);
        }

        let file_path = file.relative.as_str();
        let chunks = chunk_lines(file_path, &lines, self.config.chunk);
        if chunks.is_empty() {
            return Ok(0);
        }

        let kind = self.classifier.classify(file_path);
        let documents: Vec<NewDocument> = chunks
            .iter()
            .map(|chunk| NewDocument::new(chunk.content.clone(), Metadata::for_chunk(chunk, kind)))
            .collect();

        let ids = self
            .store
            .store_batch(documents)
            .await
            .map_err(|e| AppError::Indexing(format!("Failed to embed {}: {}", file_path, e)))?;

        debug!("Indexed {} ({}): {} chunks", file_path, kind, ids.len());
        Ok(ids.len())
    }

    /// Scan `roots` and index every file found.
    ///
    /// Returns `None` without doing anything when another run holds the gate.
    pub async fn run(&self, roots: &[PathBuf]) -> Option<IndexRunReport> {
        let Some(guard) = self.state.try_begin() else {
            info!("Indexing already in progress, ignoring request");
            return None;
        };

        Some(self.run_claimed(guard, roots).await)
    }

    /// Run with a gate already claimed through [`IndexState::try_begin`].
    ///
    /// The gate is released when the run finishes.
    pub async fn run_claimed(&self, guard: IndexGuard, roots: &[PathBuf]) -> IndexRunReport {
        let start = Instant::now();
        info!("Starting indexing run over {} roots", roots.len());

        let files = self.scan_files(roots).await;
        self.progress.scan(files.len() as u64, roots.len());

        let mut report = IndexRunReport {
            files_scanned: files.len(),
            ..Default::default()
        };

        let total = files.len() as u64;
        let mut processed = 0u64;

        for batch in files.chunks(self.config.concurrency.max(1)) {
            self.progress.embed(processed, total, batch.len());

            let outcomes = join_all(batch.iter().map(|file| self.index_file(file))).await;

            for (file, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(0) => report.files_skipped += 1,
                    Ok(chunks) => {
                        report.files_indexed += 1;
                        report.chunks_indexed += chunks;
                    }
                    Err(e) => {
                        warn!("Failed to index {:?}: {}", file.path, e);
                        report.files_failed += 1;
                    }
                }
            }

            processed += batch.len() as u64;
            self.progress
                .index(processed, total, report.chunks_indexed as u64);
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        self.progress
            .done(report.files_indexed as u64, report.files_failed as u64);

        info!(
            "Indexing run finished: {} files indexed, {} skipped, {} failed, {} chunks in {:.2}s",
            report.files_indexed,
            report.files_skipped,
            report.files_failed,
            report.chunks_indexed,
            report.duration_secs
        );

        drop(guard);
        report
    }

    /// Walk `roots` on the blocking pool so a large tree does not stall the runtime.
    async fn scan_files(&self, roots: &[PathBuf]) -> Vec<SourceFile> {
        let roots = roots.to_vec();
        let config = self.config.scan.clone();

        match tokio::task::spawn_blocking(move || scan(&roots, &config)).await {
            Ok(files) => files,
            Err(e) => {
                warn!("Scan task failed: {}", e);
                Vec::new()
            }
        }
    }
}
