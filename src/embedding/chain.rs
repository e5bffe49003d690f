//! Primary → fallback embedding chain

use super::{EmbeddingError, EmbeddingProvider};
use crate::outcome::StageResult;
use std::sync::Arc;
use std::time::Duration;

/// Embeds queries with a primary provider, falling back to a secondary one
///
/// Every vector is checked against the index dimension: a vector the index cannot
/// search counts as a failed path, not a success.
pub struct EmbeddingChain {
    primary: Arc<dyn EmbeddingProvider>,
    fallback: Option<Arc<dyn EmbeddingProvider>>,
    expected_dimension: usize,
    timeout: Duration,
}

impl EmbeddingChain {
    pub fn new(
        primary: Arc<dyn EmbeddingProvider>,
        expected_dimension: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback: None,
            expected_dimension,
            timeout,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn EmbeddingProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn primary_model(&self) -> &str {
        self.primary.model_name()
    }

    pub fn fallback_model(&self) -> Option<&str> {
        self.fallback.as_ref().map(|f| f.model_name())
    }

    /// Embed `text`, reporting whether the fallback path was needed
    pub async fn embed(&self, text: &str) -> StageResult<Vec<f32>> {
        let primary_err = match self.try_provider(self.primary.as_ref(), text).await {
            Ok(vector) => return StageResult::Ok(vector),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            tracing::warn!(
                "Embedding via {} failed, no fallback configured: {}",
                self.primary.model_name(),
                primary_err
            );
            return StageResult::Failed(format!("primary: {}", primary_err));
        };

        tracing::warn!(
            "Embedding via {} failed, falling back to {}: {}",
            self.primary.model_name(),
            fallback.model_name(),
            primary_err
        );

        match self.try_provider(fallback.as_ref(), text).await {
            Ok(vector) => StageResult::Degraded(vector, format!("primary: {}", primary_err)),
            Err(fallback_err) => StageResult::Failed(format!(
                "primary: {}; fallback: {}",
                primary_err, fallback_err
            )),
        }
    }

    async fn try_provider(
        &self,
        provider: &dyn EmbeddingProvider,
        text: &str,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let vector = tokio::time::timeout(self.timeout, provider.embed(text))
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout))??;

        if vector.len() != self.expected_dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.expected_dimension,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}
