//! Studio Core Library
//!
//! Foundational utilities shared by the retrieval core and the CLI:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EmbeddingSettings, RagSettings};
pub use error::{AppError, AppResult};
