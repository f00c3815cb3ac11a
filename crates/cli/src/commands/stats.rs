//! Stats command handler.
//!
//! Shows vector store and embedding cache statistics.

use clap::Args;
use studio_core::{config::AppConfig, AppResult};

use super::{open_warm_service, print_json};

/// Show store and cache statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let service = open_warm_service(config).await?;
        let stats = service.stats();

        if self.json {
            return print_json(&stats);
        }

        let last_updated = stats
            .vector_store
            .last_updated
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());

        println!("Vector store");
        println!("  Documents:    {}", stats.vector_store.document_count);
        println!("  Last updated: {}", last_updated);
        println!("Embedding cache");
        println!(
            "  Entries:      {}/{}",
            stats.embeddings_cache.size, stats.embeddings_cache.max_size
        );
        println!("  TTL:          {}s", stats.embeddings_cache.ttl_secs);

        Ok(())
    }
}
