//! Error types for the aisearch service.

use aisearch_pipeline::PipelineError;

/// Top-level error type for service startup and configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error (unreadable file, bad TOML, invalid override).
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// Pipeline construction or fetcher startup error.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ServiceError>;
