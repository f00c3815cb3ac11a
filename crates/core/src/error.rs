//! Error types for the Studio retrieval core.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! embedding provider, indexing, persistence and serialization failures.

use thiserror::Error;

/// Unified error type for the Studio retrieval core.
///
/// All fallible functions return `Result<T, AppError>`.
/// Nothing in the retrieval path panics; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding provider failures (remote model unavailable, bad response, ...)
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// A single file could not be read, chunked or embedded during an indexing run
    #[error("Indexing error: {0}")]
    Indexing(String),

    /// Document store read/write failures
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether this error originated in the embedding provider.
    pub fn is_provider(&self) -> bool {
        matches!(self, AppError::Provider(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = AppError::Provider("model not loaded".to_string());
        assert_eq!(err.to_string(), "Embedding provider error: model not loaded");
        assert!(err.is_provider());
    }

    #[test]
    fn test_every_variant_names_its_origin() {
        let errors = [
            AppError::Config("bad overlap".to_string()),
            AppError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
            AppError::Provider("timeout".to_string()),
            AppError::Indexing("src/a.ts".to_string()),
            AppError::Persistence("disk full".to_string()),
            AppError::Serialization("eof".to_string()),
        ];
        for err in &errors {
            let prefix = match err {
                AppError::Config(_) => "Configuration error: ",
                AppError::Io(_) => "I/O error: ",
                AppError::Provider(_) => "Embedding provider error: ",
                AppError::Indexing(_) => "Indexing error: ",
                AppError::Persistence(_) => "Persistence error: ",
                AppError::Serialization(_) => "Serialization error: ",
            };
            assert!(err.to_string().starts_with(prefix), "{}", err);
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
        assert!(!err.is_provider());
    }
}
