//! Query command handler.
//!
//! Runs a project-scoped hybrid search and prints ranked sources.

use clap::Args;
use studio_core::{config::AppConfig, AppResult};
use studio_rag::QueryOptions;

use super::{open_warm_service, print_json};

/// Query indexed content
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Question or search text
    pub question: String,

    /// Number of sources to return
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Restrict results to one project
    #[arg(long)]
    pub project: Option<String>,

    /// Skip the assembled context block
    #[arg(long)]
    pub no_context: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");
        tracing::debug!("Query options: {:?}", self);

        let service = open_warm_service(config).await?;
        let options = QueryOptions {
            project_id: self.project.clone(),
            top_k: self.top_k,
            include_context: !self.no_context,
        };
        let response = service.query(&self.question, options).await?;

        if self.json {
            return print_json(&response);
        }

        if response.sources.is_empty() {
            println!("No matching sources.");
            return Ok(());
        }

        println!("Confidence: {:.0}%\n", response.confidence * 100.0);
        for (i, source) in response.sources.iter().enumerate() {
            println!(
                "{}. {} (score: {:.3})",
                i + 1,
                source.metadata.label().unwrap_or("Untitled"),
                source.score
            );
        }

        if let Some(context) = &response.context {
            println!("\n{}", context.context);
        }

        Ok(())
    }
}
