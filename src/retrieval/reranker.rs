//! Cross-encoder re-ranking

use crate::config::RerankConfig;
use crate::outcome::StageResult;
use crate::retrieval::SearchResult;
use async_trait::async_trait;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RerankError {
    #[error("Reranker initialization failed: {0}")]
    InitializationError(String),

    #[error("Reranking failed: {0}")]
    RerankingError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Reranking timed out after {0:?}")]
    Timeout(Duration),
}

/// Pairwise relevance model scoring (query, passage) pairs
#[async_trait]
pub trait RelevanceModel: Send + Sync {
    /// One score per passage, in input order
    async fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RerankError>;

    fn model_name(&self) -> &str;
}

/// Cross-encoder backed by FastEmbed
///
/// FastEmbed returns raw logits; scores are passed through a sigmoid so the
/// relevance threshold is a probability in (0, 1).
pub struct FastEmbedReranker {
    model: Arc<TextRerank>,
    model_name: String,
}

impl FastEmbedReranker {
    /// Create a new reranker with specified model
    ///
    /// # Arguments
    /// * `model_name` - "bge-reranker-base", "bge-reranker-v2-m3" (multilingual) or
    ///   "jina-reranker-v1-turbo-en"
    pub fn new(model_name: &str) -> Result<Self, RerankError> {
        let model = match model_name {
            "bge-reranker-base" => RerankerModel::BGERerankerBase,
            "bge-reranker-v2-m3" => RerankerModel::BGERerankerV2M3,
            "jina-reranker-v1-turbo-en" => RerankerModel::JINARerankerV1TurboEn,
            _ => {
                return Err(RerankError::InitializationError(format!(
                    "Unsupported reranker model: {}",
                    model_name
                )));
            }
        };

        tracing::info!("Initializing reranker model: {}", model_name);

        let init_options = RerankInitOptions::new(model).with_show_download_progress(false);

        let model = TextRerank::try_new(init_options)
            .map_err(|e| RerankError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
        })
    }

    /// Create reranker with default model
    pub fn with_default_model() -> Result<Self, RerankError> {
        Self::new("bge-reranker-base")
    }
}

#[async_trait]
impl RelevanceModel for FastEmbedReranker {
    async fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RerankError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        if query.is_empty() {
            return Err(RerankError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        // ONNX inference is CPU-bound; keep it off the async workers so timeouts can fire
        let model = Arc::clone(&self.model);
        let query_owned = query.to_string();
        let documents: Vec<String> = passages.iter().map(|p| p.to_string()).collect();
        let results = tokio::task::spawn_blocking(move || {
            model.rerank(query_owned, documents, false, None)
        })
        .await
        .map_err(|e| RerankError::RerankingError(format!("Reranking task failed: {}", e)))?
        .map_err(|e| RerankError::RerankingError(e.to_string()))?;

        // FastEmbed returns results sorted by score; put them back in input order
        let mut scores = vec![None; passages.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = Some(sigmoid(result.score));
            }
        }

        scores
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                s.ok_or_else(|| {
                    RerankError::RerankingError(format!("No score returned for passage {}", i))
                })
            })
            .collect()
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Map a cross-encoder logit to a relevance probability
pub(crate) fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

/// Re-ranks candidates and filters them by relevance threshold
///
/// Re-ranking improves precision but is never required for an answer: if the model
/// is missing, fails, or times out, the candidates pass through untouched (truncated
/// to `top_k_final`) and the result is tagged `Degraded`.
pub struct Reranker {
    model: Option<Arc<dyn RelevanceModel>>,
    threshold: f32,
    top_k_final: usize,
    timeout: Duration,
}

impl Reranker {
    pub fn new(
        model: Option<Arc<dyn RelevanceModel>>,
        threshold: f32,
        top_k_final: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            threshold,
            top_k_final,
            timeout,
        }
    }

    pub fn from_config(
        model: Option<Arc<dyn RelevanceModel>>,
        config: &RerankConfig,
        timeout: Duration,
    ) -> Self {
        Self::new(model, config.threshold, config.top_k_final, timeout)
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.model_name())
    }

    /// Re-score, sort, filter by threshold and truncate
    ///
    /// Every survivor scores strictly above the threshold. The list may be empty.
    pub async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<SearchResult>,
    ) -> StageResult<Vec<SearchResult>> {
        if candidates.is_empty() {
            return StageResult::Ok(candidates);
        }

        let Some(model) = &self.model else {
            candidates.truncate(self.top_k_final);
            return StageResult::Degraded(candidates, "no relevance model configured".to_string());
        };

        let passages: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let scored = tokio::time::timeout(self.timeout, model.score_pairs(query, &passages))
            .await
            .map_err(|_| RerankError::Timeout(self.timeout))
            .and_then(|r| r)
            .and_then(|scores| {
                if scores.len() == candidates.len() {
                    Ok(scores)
                } else {
                    Err(RerankError::RerankingError(format!(
                        "Got {} scores for {} passages",
                        scores.len(),
                        candidates.len()
                    )))
                }
            });

        let scores = match scored {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!("Re-ranking degraded, keeping retrieval order: {}", e);
                candidates.truncate(self.top_k_final);
                return StageResult::Degraded(candidates, e.to_string());
            }
        };

        for (candidate, score) in candidates.iter_mut().zip(scores) {
            candidate.set_reranked(score);
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.retain(|c| c.score > self.threshold);
        candidates.truncate(self.top_k_final);

        tracing::debug!(
            "Re-ranking kept {} candidates above threshold {}",
            candidates.len(),
            self.threshold
        );

        StageResult::Ok(candidates)
    }
}
