//! Indexing run gating and per-file failure isolation.

use crate::embeddings::{CacheConfig, EmbeddingCache};
use crate::indexer::{IndexState, Indexer, IndexerConfig};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::service::RagService;
use crate::store::{SearchOptions, VectorStore};
use crate::testing::{wait_until, ScriptedProvider};
use crate::types::ChunkKind;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use studio_core::RagSettings;
use tempfile::TempDir;
use tokio::sync::Semaphore;

fn source_file(name: &str, lines: usize) -> String {
    (1..=lines)
        .map(|i| format!("export function {}Step{}(input) {{ return transform(input, {}); }}", name, i, i))
        .collect::<Vec<_>>()
        .join("\n")
}

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn indexer_with(provider: Arc<ScriptedProvider>) -> (Arc<Indexer>, Arc<VectorStore>, Arc<IndexState>) {
    let cache = EmbeddingCache::new(provider, CacheConfig::default());
    let store = Arc::new(VectorStore::new(Arc::new(cache), None));
    let state = Arc::new(IndexState::new());
    let indexer = Indexer::new(store.clone(), state.clone(), IndexerConfig::default());
    (Arc::new(indexer), store, state)
}

#[tokio::test]
async fn test_concurrent_run_is_rejected_while_active() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/billing.service.ts", source_file("billing", 30).as_bytes());

    let gate = Arc::new(Semaphore::new(0));
    let provider = Arc::new(ScriptedProvider::new(32).with_gate(gate.clone()));

    let scans = Arc::new(AtomicUsize::new(0));
    let scans_seen = scans.clone();
    let progress = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
        if event.phase == "scan" {
            scans_seen.fetch_add(1, Ordering::SeqCst);
        }
    }));

    let cache = EmbeddingCache::new(provider, CacheConfig::default());
    let store = Arc::new(VectorStore::new(Arc::new(cache), None));
    let state = Arc::new(IndexState::new());
    let indexer = Arc::new(
        Indexer::new(store.clone(), state.clone(), IndexerConfig::default()).with_progress(progress),
    );

    let roots = vec![temp.path().to_path_buf()];
    let first = {
        let indexer = indexer.clone();
        let roots = roots.clone();
        tokio::spawn(async move { indexer.run(&roots).await })
    };

    wait_until(|| scans.load(Ordering::SeqCst) == 1).await;
    assert!(state.is_indexing());

    // Second trigger is a no-op: no report, no second scan, gate still held
    assert!(indexer.run(&roots).await.is_none());
    assert!(state.is_indexing());
    assert_eq!(scans.load(Ordering::SeqCst), 1);

    gate.add_permits(1);
    let report = first.await.unwrap().expect("first run should complete");

    assert_eq!(report.files_indexed, 1);
    assert!(!state.is_indexing());
    assert_eq!(scans.load(Ordering::SeqCst), 1);
    assert_eq!(store.len(), report.chunks_indexed);
}

#[tokio::test]
async fn test_unreadable_file_does_not_block_siblings() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/a.service.ts", source_file("alpha", 20).as_bytes());
    // Invalid UTF-8 with enough lines to pass the line threshold
    let mut corrupted = vec![0xff, 0xfe, 0xfd];
    corrupted.extend(b"\n\n\n\n\n\n\n\nbroken\n");
    write(temp.path(), "src/b.service.ts", &corrupted);
    write(temp.path(), "src/c.controller.ts", source_file("charlie", 20).as_bytes());

    let (indexer, store, state) = indexer_with(Arc::new(ScriptedProvider::new(32)));
    let report = indexer.run(&[temp.path().to_path_buf()]).await.unwrap();

    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_indexed, 2);
    assert!(!state.is_indexing());

    let hits = store
        .search("transform input", &SearchOptions::top_k(10))
        .await
        .unwrap();
    let mut files: Vec<String> = hits
        .iter()
        .filter_map(|h| h.metadata.file_path.clone())
        .map(|p| p.rsplit('/').next().unwrap().to_string())
        .collect();
    files.sort();
    files.dedup();
    assert_eq!(files, vec!["a.service.ts", "c.controller.ts"]);
}

#[tokio::test]
async fn test_embedding_failure_is_isolated_to_its_file() {
    let temp = TempDir::new().unwrap();
    let poisoned = source_file("poisoned", 8);
    write(temp.path(), "src/poisoned.ts", poisoned.as_bytes());
    write(temp.path(), "src/healthy.ts", source_file("healthy", 8).as_bytes());

    // Batched calls fail; the per-text fallback fails only for the poisoned chunk
    let provider = Arc::new(
        ScriptedProvider::new(32)
            .with_failing_batches()
            .fail_on(&poisoned),
    );
    let (indexer, store, _) = indexer_with(provider);

    let report = indexer.run(&[temp.path().to_path_buf()]).await.unwrap();

    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_indexed, 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_start_indexing_runs_in_background_and_rejects_overlap() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/projects.service.ts", source_file("projects", 60).as_bytes());

    let gate = Arc::new(Semaphore::new(0));
    let provider = Arc::new(ScriptedProvider::new(32).with_gate(gate.clone()));
    let service = RagService::new(provider, None, RagSettings::default());

    assert!(service.start_indexing(vec![temp.path().to_path_buf()]));
    assert!(service.index_status().is_indexing);
    assert!(!service.start_indexing(vec![temp.path().to_path_buf()]));
    assert!(service.index_codebase(&[temp.path().to_path_buf()]).await.is_none());

    gate.add_permits(1);
    wait_until(|| !service.index_status().is_indexing).await;

    let status = service.index_status();
    assert_eq!(status.document_count, 2);
}

#[tokio::test]
async fn test_classification_ignores_dirs_above_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("tests").join("checkout");
    write(&root, "src/utils/slugify.ts", source_file("slugify", 20).as_bytes());

    let (indexer, store, _) = indexer_with(Arc::new(ScriptedProvider::new(32)));
    let report = indexer.run(&[root]).await.unwrap();
    assert_eq!(report.files_indexed, 1);

    let hits = store
        .search("transform input", &SearchOptions::top_k(1))
        .await
        .unwrap();
    assert_eq!(hits[0].metadata.kind, Some(ChunkKind::Code));
    assert_eq!(hits[0].metadata.file_path.as_deref(), Some("src/utils/slugify.ts"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_run_completes_on_single_threaded_runtime() {
    let temp = TempDir::new().unwrap();
    for i in 0..25 {
        write(
            temp.path(),
            &format!("pkg{}/src/module{}.service.ts", i % 5, i),
            source_file(&format!("module{}", i), 12).as_bytes(),
        );
    }

    let (indexer, store, state) = indexer_with(Arc::new(ScriptedProvider::new(32)));
    let report = indexer.run(&[temp.path().to_path_buf()]).await.unwrap();

    assert_eq!(report.files_scanned, 25);
    assert_eq!(report.files_indexed, 25);
    assert_eq!(store.len(), 25);
    assert!(!state.is_indexing());
}
