//! Workspace paths used by the retrieval core.

use std::path::{Path, PathBuf};

/// Get the directory holding retrieval state.
pub fn get_rag_dir(workspace: &Path) -> PathBuf {
    workspace.join(".studio").join("rag")
}

/// Get the path to the JSON-lines document store.
pub fn documents_path(workspace: &Path) -> PathBuf {
    get_rag_dir(workspace).join("documents.jsonl")
}
