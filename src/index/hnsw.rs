//! In-process HNSW vector store

use super::{IndexMatch, IndexStats, VectorIndexError, VectorStore, TEXT_KEY};
use crate::config::IndexConfig;
use async_trait::async_trait;
use hnsw_rs::prelude::*;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

/// Upper bound on HNSW layers; hnsw_rs caps it at 16 internally
const MAX_LAYERS: usize = 16;

struct StoredChunk {
    id: String,
    metadata: BTreeMap<String, Value>,
}

/// HNSW vector store with per-chunk metadata
///
/// Provides approximate nearest neighbour search with cosine similarity.
/// Chunks are addressed internally by insertion position.
pub struct HnswStore {
    index: Hnsw<'static, f32, DistCosine>,
    chunks: RwLock<Vec<StoredChunk>>,
    dimension: usize,
    ef_search: usize,
}

impl HnswStore {
    /// Create an empty store
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `m` - HNSW M parameter (number of connections per layer)
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    /// * `ef_search` - HNSW search parameter (higher = better recall, slower search)
    /// * `max_elements` - Capacity hint for the graph
    pub fn new(
        dimension: usize,
        m: usize,
        ef_construction: usize,
        ef_search: usize,
        max_elements: usize,
    ) -> Result<Self, VectorIndexError> {
        if dimension == 0 {
            return Err(VectorIndexError::InitializationError(
                "Dimension must be greater than 0".to_string(),
            ));
        }

        let index = Hnsw::<f32, DistCosine>::new(
            m,
            max_elements,
            MAX_LAYERS,
            ef_construction,
            DistCosine,
        );

        Ok(Self {
            index,
            chunks: RwLock::new(Vec::new()),
            dimension,
            ef_search,
        })
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self, VectorIndexError> {
        Self::new(
            config.dimension,
            config.hnsw_m,
            config.hnsw_ef_construction,
            config.hnsw_ef_search,
            config.max_elements,
        )
    }

    /// Insert a chunk with its embedding
    ///
    /// `text` is stored under the `text` metadata key so query results are
    /// self-contained.
    pub fn insert(
        &self,
        id: impl Into<String>,
        text: impl Into<String>,
        mut metadata: BTreeMap<String, Value>,
        vector: &[f32],
    ) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        if vector.iter().all(|x| *x == 0.0) {
            return Err(VectorIndexError::InsertError(
                "Zero vector has no cosine direction".to_string(),
            ));
        }

        metadata.insert(TEXT_KEY.to_string(), Value::String(text.into()));

        let mut chunks = self.chunks.write();
        let position = chunks.len();
        self.index.insert((vector, position));
        chunks.push(StoredChunk {
            id: id.into(),
            metadata,
        });

        Ok(())
    }

    /// Get the number of vectors in the store
    pub fn len(&self) -> u64 {
        self.chunks.read().len() as u64
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for HnswStore {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>, VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let chunks = self.chunks.read();
        if chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let ef = self.ef_search.max(k);
        let neighbours = self.index.search(vector, k, ef);

        let mut matches = Vec::with_capacity(neighbours.len());
        for neighbour in neighbours {
            let chunk = chunks.get(neighbour.d_id).ok_or_else(|| {
                VectorIndexError::SearchError(format!(
                    "Index returned unknown position {}",
                    neighbour.d_id
                ))
            })?;
            matches.push(IndexMatch {
                id: chunk.id.clone(),
                score: 1.0 - neighbour.distance,
                metadata: chunk.metadata.clone(),
            });
        }

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(matches)
    }

    async fn describe(&self) -> Result<IndexStats, VectorIndexError> {
        Ok(IndexStats {
            vector_count: self.len(),
            dimension: self.dimension,
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
