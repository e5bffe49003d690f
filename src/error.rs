use crate::embedding::EmbeddingError;
use crate::generation::GenerationError;
use crate::index::VectorIndexError;
use crate::retrieval::{FusionError, LexicalError, RerankError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the retrieval pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),

    #[error(transparent)]
    Lexical(#[from] LexicalError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error(transparent)]
    Rerank(#[from] RerankError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;
