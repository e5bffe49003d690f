//! Vector store interface
//!
//! The pipeline only ever issues one nearest-neighbour query per request and asks for
//! summary statistics; storage and ingestion belong to the store implementation.

mod hnsw;

pub use hnsw::HnswStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Metadata key carrying the passage text
pub const TEXT_KEY: &str = "text";
/// Metadata key carrying the originating file name
pub const FILENAME_KEY: &str = "filename";
/// Metadata key carrying the display source label
pub const SOURCE_KEY: &str = "source";

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Index request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// One nearest-neighbour hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    /// Stable chunk identifier
    pub id: String,
    /// Similarity score (higher is more similar; scale is store-defined)
    pub score: f32,
    /// Chunk metadata; carries at least `text` and `filename`
    pub metadata: BTreeMap<String, Value>,
}

/// Summary statistics reported by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub vector_count: u64,
    pub dimension: usize,
}

/// A searchable vector index
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `k` matches ordered by descending similarity
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>, VectorIndexError>;

    /// Describe the index contents
    async fn describe(&self) -> Result<IndexStats, VectorIndexError>;

    /// Dimension of the vectors this store accepts
    fn dimension(&self) -> usize;
}
