//! Dense retrieval against the vector store

use crate::embedding::EmbeddingChain;
use crate::index::{VectorIndexError, VectorStore};
use crate::outcome::StageResult;
use crate::retrieval::SearchResult;
use std::sync::Arc;
use std::time::Duration;

/// Embeds a query and runs one nearest-neighbour search
///
/// Never returns an error: an unreachable embedding chain or index yields
/// `StageResult::Failed`, which callers treat as an empty candidate set.
pub struct DenseRetriever {
    embeddings: EmbeddingChain,
    store: Arc<dyn VectorStore>,
    timeout: Duration,
}

impl DenseRetriever {
    pub fn new(embeddings: EmbeddingChain, store: Arc<dyn VectorStore>, timeout: Duration) -> Self {
        Self {
            embeddings,
            store,
            timeout,
        }
    }

    pub fn embeddings(&self) -> &EmbeddingChain {
        &self.embeddings
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Retrieve up to `k` candidates ordered by similarity
    pub async fn retrieve(&self, query: &str, k: usize) -> StageResult<Vec<SearchResult>> {
        let embedded = self.embeddings.embed(query).await;
        let degraded_reason = embedded.reason().map(str::to_string);

        let Some(vector) = embedded.into_value() else {
            let reason = degraded_reason.unwrap_or_default();
            tracing::warn!("Dense retrieval unavailable, no embedding: {}", reason);
            return StageResult::Failed(reason);
        };

        let matches = match tokio::time::timeout(self.timeout, self.store.query(&vector, k)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                tracing::warn!("Dense retrieval unavailable, index query failed: {}", e);
                return StageResult::Failed(e.to_string());
            }
            Err(_) => {
                let e = VectorIndexError::Timeout(self.timeout);
                tracing::warn!("Dense retrieval unavailable: {}", e);
                return StageResult::Failed(e.to_string());
            }
        };

        let mut results: Vec<SearchResult> =
            matches.into_iter().map(SearchResult::from_match).collect();
        // Fusion breaks ties by this order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);

        tracing::debug!("Dense retrieval returned {} candidates", results.len());

        match degraded_reason {
            Some(reason) => StageResult::Degraded(results, reason),
            None => StageResult::Ok(results),
        }
    }
}
