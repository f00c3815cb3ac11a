//! Configuration management.
//!
//! Configuration is merged from several layers, later layers winning:
//! - Built-in defaults
//! - Config file (`.studio/config.yaml` or `STUDIO_CONFIG`)
//! - Environment variables
//! - Command-line flags (`with_overrides`)
//!
//! The configuration is workspace-centric, with persisted state under `.studio/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding backends the retrieval core knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .studio/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    /// Embedding provider selection
    pub embedding: EmbeddingSettings,

    /// Cache, chunking, indexing and retrieval tuning
    pub rag: RagSettings,
}

/// Which embedding backend to use and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Base URL for HTTP providers
    pub endpoint: Option<String>,

    /// Request timeout for HTTP providers
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(), // Local-first default
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

/// Retrieval-core tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RagSettings {
    /// Age after which a cached embedding is treated as absent
    pub cache_ttl_secs: u64,

    /// Upper bound on cached embeddings
    pub cache_max_entries: usize,

    /// Lines per source chunk
    pub chunk_size: usize,

    /// Lines shared by consecutive chunks
    pub chunk_overlap: usize,

    /// Chunks shorter than this (in characters) are discarded
    pub min_chunk_chars: usize,

    /// Files with fewer lines are not indexed
    pub min_file_lines: usize,

    /// Files indexed concurrently per batch
    pub index_concurrency: usize,

    /// Repopulate the in-memory index from the document store on startup
    pub warm_load: bool,

    /// Maximum documents read during warm-load
    pub warm_load_limit: usize,

    /// Character budget for assembled context
    pub max_context_chars: usize,

    /// Minimum cosine score for context retrieval; unset keeps every hit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_relevance: Option<f32>,

    /// Weight of the semantic score in hybrid search
    pub semantic_weight: f32,

    /// Paragraph chunk bound for ad-hoc documents
    pub document_max_chunk_chars: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60 * 60,
            cache_max_entries: 1000,
            chunk_size: 50,
            chunk_overlap: 10,
            min_chunk_chars: 50,
            min_file_lines: 5,
            index_concurrency: 5,
            warm_load: false,
            warm_load_limit: 500,
            max_context_chars: 6000,
            min_relevance: None,
            semantic_weight: 0.7,
            document_max_chunk_chars: 800,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    embedding: Option<EmbeddingSettings>,
    rag: Option<RagSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
            embedding: EmbeddingSettings::default(),
            rag: RagSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `STUDIO_WORKSPACE`: Override workspace path
    /// - `STUDIO_CONFIG`: Path to config file
    /// - `STUDIO_EMBEDDING_PROVIDER`: Embedding backend
    /// - `STUDIO_EMBEDDING_MODEL`: Embedding model identifier
    /// - `STUDIO_WARM_LOAD`: Enable startup warm-load ("1"/"true")
    /// - `OLLAMA_URL`: Endpoint for the ollama backend
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use studio_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("STUDIO_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("STUDIO_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.studio_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("STUDIO_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("STUDIO_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(endpoint) = std::env::var("OLLAMA_URL") {
            config.embedding.endpoint = Some(endpoint);
        }

        if let Ok(flag) = std::env::var("STUDIO_WARM_LOAD") {
            config.rag.warm_load = parse_flag(&flag);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.json_logs = json;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the
    /// config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.embedding.provider = provider;
        }

        if let Some(model) = model {
            self.embedding.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if json_logs {
            self.json_logs = true;
        }

        self
    }

    /// Get the path to the .studio directory.
    pub fn studio_dir(&self) -> PathBuf {
        self.workspace.join(".studio")
    }

    /// Ensure the .studio directory exists.
    pub fn ensure_studio_dir(&self) -> AppResult<()> {
        let studio_dir = self.studio_dir();
        if !studio_dir.exists() {
            std::fs::create_dir_all(&studio_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .studio directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate the embedding and retrieval settings.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.embedding.provider.as_str();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        self.rag.validate()
    }
}

impl RagSettings {
    /// Reject settings the chunker, cache or indexer cannot honor.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be greater than zero".to_string()));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.cache_max_entries == 0 {
            return Err(AppError::Config(
                "cacheMaxEntries must be greater than zero".to_string(),
            ));
        }

        if self.index_concurrency == 0 {
            return Err(AppError::Config(
                "indexConcurrency must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.semantic_weight) {
            return Err(AppError::Config(format!(
                "semanticWeight must be within [0, 1], got {}",
                self.semantic_weight
            )));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.rag.chunk_size, 50);
        assert_eq!(config.rag.chunk_overlap, 10);
        assert_eq!(config.rag.cache_max_entries, 1000);
        assert!(!config.rag.warm_load);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_studio_dir() {
        let config = AppConfig::default();
        assert!(config.studio_dir().ends_with(".studio"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("nomic-embed-text".to_string()),
            None,
            true,
            false,
            true,
        );

        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert!(config.verbose);
        assert!(config.json_logs);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_partial_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "embedding:\n  provider: ollama\n  model: nomic-embed-text\n  dimensions: 768\nrag:\n  chunkSize: 80\n  warmLoad: true\nlogging:\n  color: false\n",
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.embedding.provider, "ollama");
        assert_eq!(merged.embedding.dimensions, 768);
        assert_eq!(merged.rag.chunk_size, 80);
        // Unset keys keep their defaults
        assert_eq!(merged.rag.chunk_overlap, 10);
        assert!(merged.rag.warm_load);
        assert!(merged.no_color);
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "vertex".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = 50;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunkOverlap"));
    }

    #[test]
    fn test_validate_semantic_weight_range() {
        let mut settings = RagSettings::default();
        settings.semantic_weight = 1.5;
        assert!(settings.validate().is_err());
        settings.semantic_weight = 1.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(!parse_flag("no"));
    }
}
