//! Command handlers for the Studio CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod add;
pub mod context;
pub mod index;
pub mod query;
pub mod stats;

// Re-export command types for convenience
pub use add::AddCommand;
pub use context::ContextCommand;
pub use index::IndexCommand;
pub use query::QueryCommand;
pub use stats::StatsCommand;

use studio_core::{config::AppConfig, AppResult};
use studio_rag::RagService;

/// Build the retrieval service and load previously persisted documents.
///
/// Every CLI invocation is a fresh process, so read commands warm the
/// in-memory store from the workspace document store before answering.
pub(crate) async fn open_warm_service(config: &AppConfig) -> AppResult<RagService> {
    let service = RagService::from_config(config).await?;
    match service.store().warm_load(config.rag.warm_load_limit).await {
        Ok(loaded) => tracing::debug!("Warm-loaded {} documents", loaded),
        Err(e) => tracing::warn!("Warm-load failed, continuing with an empty store: {}", e),
    }
    Ok(service)
}

/// Render a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
