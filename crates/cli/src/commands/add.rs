//! Add command handler.
//!
//! Indexes one ad-hoc document, chunked by paragraph.

use clap::Args;
use std::path::PathBuf;
use studio_core::{config::AppConfig, AppResult};
use studio_rag::{DocumentMetadata, RagService};

use super::print_json;

/// Add a single document to the store
#[derive(Args, Debug)]
pub struct AddCommand {
    /// Document file to add
    pub file: PathBuf,

    /// Document title (default: file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Project the document belongs to
    #[arg(long)]
    pub project: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AddCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing add command for {:?}", self.file);

        let content = tokio::fs::read_to_string(&self.file).await?;

        let title = self.title.clone().or_else(|| {
            self.file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        });
        let metadata = DocumentMetadata {
            source: Some(self.file.display().to_string()),
            project_id: self.project.clone(),
            title,
            kind: None,
        };

        let service = RagService::from_config(config).await?;
        let result = service.index_document(&content, metadata).await?;
        service.flush().await;

        if self.json {
            print_json(&result)?;
        } else {
            println!(
                "Added {} ({} chunks)",
                self.file.display(),
                result.chunks_indexed
            );
        }

        Ok(())
    }
}
