//! Index command handler.
//!
//! Walks the given paths, chunks and embeds source files.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use studio_core::{config::AppConfig, AppError, AppResult};
use studio_rag::{ProgressEvent, ProgressReporter, RagService};

use super::print_json;

/// Index source files under one or more paths
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Files or directories to index (default: workspace root)
    pub paths: Vec<PathBuf>,

    /// Hide progress lines
    #[arg(short, long)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");
        tracing::debug!("Index options: {:?}", self);

        let roots = self.roots(config);

        let progress = if self.quiet || self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event.format_simple())))
        };

        let service = RagService::from_config(config).await?.with_progress(progress);
        let report = service
            .index_codebase(&roots)
            .await
            .ok_or_else(|| AppError::Indexing("An indexing run is already in progress".to_string()))?;
        service.flush().await;

        if self.json {
            print_json(&report)?;
        } else {
            println!(
                "Indexed {} of {} files ({} chunks, {} skipped, {} failed) in {:.2}s",
                report.files_indexed,
                report.files_scanned,
                report.chunks_indexed,
                report.files_skipped,
                report.files_failed,
                report.duration_secs
            );
        }

        Ok(())
    }

    fn roots(&self, config: &AppConfig) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            return vec![config.workspace.clone()];
        }

        self.paths
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    config.workspace.join(p)
                }
            })
            .collect()
    }
}
