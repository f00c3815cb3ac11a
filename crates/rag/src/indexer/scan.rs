//! Source tree discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "target",
    "coverage",
    ".git",
    ".next",
    ".turbo",
    ".cache",
    "__pycache__",
];

/// File extensions collected by a scan.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "rs", "py", "go", "java", "prisma", "sql", "md",
    "json", "yaml", "yml",
];

/// What a scan skips and what it collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub skip_dirs: HashSet<String>,
    pub extensions: HashSet<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScanConfig {
    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map(|name| self.skip_dirs.contains(name))
                .unwrap_or(false)
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

/// A file found by [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Location on disk
    pub path: PathBuf,
    /// `/`-separated path inside the scanned root; the file name for file roots
    pub relative: String,
}

impl SourceFile {
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let relative = path
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .or_else(|| path.file_name().map(Path::new))
            .unwrap_or(path.as_path())
            .to_string_lossy()
            .replace('\\', "/");

        Self { path, relative }
    }
}

/// Recursively collect source files under each root, sorted per root.
///
/// A root that is itself a file is included when its extension is accepted.
/// Unreadable subtrees are skipped.
pub fn scan(roots: &[PathBuf], config: &ScanConfig) -> Vec<SourceFile> {
    let mut files = Vec::new();

    for root in roots {
        if root.is_file() {
            if config.accepts(root) {
                files.push(SourceFile::new(root, root.clone()));
            }
            continue;
        }

        let mut found: Vec<SourceFile> = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !config.is_skipped_dir(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping unreadable path under {:?}: {}", root, e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && config.accepts(entry.path()))
            .map(|entry| SourceFile::new(root, entry.into_path()))
            .collect();

        found.sort_by(|a, b| a.path.cmp(&b.path));
        files.extend(found);
    }

    tracing::debug!("Scanned {} roots, found {} files", roots.len(), files.len());
    files
}
