//! Context command handler.

use clap::Args;
use studio_core::{config::AppConfig, AppResult};

use super::open_warm_service;

/// Print the context block for a query
#[derive(Args, Debug)]
pub struct ContextCommand {
    /// Query text
    pub query: String,

    /// Number of chunks to consider
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,
}

impl ContextCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing context command");

        let service = open_warm_service(config).await?;
        let context = service.retrieve_context(&self.query, self.top_k).await?;
        println!("{}", context);

        Ok(())
    }
}
