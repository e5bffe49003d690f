//! The query orchestrator

use super::{
    ModelIdentifiers, PipelineStage, QueryOutcome, QueryRequest, QueryResponse, SystemStats,
};
use crate::config::{Config, ResponsesConfig};
use crate::context::ContextAssembler;
use crate::error::Result;
use crate::generation::{build_user_message, ExchangePair, GenerationError, GenerationRequest, Generator};
use crate::memory::{ConversationMemory, ConversationTurn, HistoryEntry};
use crate::outcome::StageResult;
use crate::retrieval::{
    fuse, Bm25Model, DenseRetriever, FusionConfig, LexicalModel, RelevanceModel, RerankError,
    Reranker, SearchResult,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Collaborators an engine is assembled from
pub struct EngineParts {
    pub retriever: DenseRetriever,
    pub relevance_model: Option<Arc<dyn RelevanceModel>>,
    pub generator: Arc<dyn Generator>,
    pub memory: Arc<ConversationMemory>,
}

/// Answers queries against an indexed legal corpus
///
/// Shared across tasks: every operation takes `&self`. Conversation memory is the only
/// mutable state the engine touches directly, and its lock is never held across an
/// await point.
pub struct RagEngine {
    retriever: DenseRetriever,
    lexical: Arc<dyn LexicalModel>,
    fusion: FusionConfig,
    reranker: Reranker,
    rerank_enabled: bool,
    assembler: ContextAssembler,
    memory: Arc<ConversationMemory>,
    generator: Arc<dyn Generator>,
    system_prompt: String,
    history_turns: usize,
    generation_timeout: Duration,
    responses: ResponsesConfig,
}

impl RagEngine {
    pub fn new(config: &Config, parts: EngineParts) -> Result<Self> {
        let fusion = FusionConfig::new(config.retrieval.alpha, config.retrieval.top_k_initial)?;
        let relevance_model = if config.rerank.enabled {
            parts.relevance_model
        } else {
            None
        };

        tracing::info!(
            "Query engine ready (embedding: {}, reranker: {}, generator: {})",
            parts.retriever.embeddings().primary_model(),
            relevance_model
                .as_ref()
                .map(|m| m.model_name())
                .unwrap_or("none"),
            parts.generator.model_name()
        );

        Ok(Self {
            retriever: parts.retriever,
            lexical: Arc::new(Bm25Model::new(config.lexical.language)),
            fusion,
            reranker: Reranker::from_config(relevance_model, &config.rerank, config.timeouts.rerank()),
            rerank_enabled: config.rerank.enabled,
            assembler: ContextAssembler::from_config(&config.context),
            memory: parts.memory,
            generator: parts.generator,
            system_prompt: config.generation.system_prompt.clone(),
            history_turns: config.memory.history_turns,
            generation_timeout: config.timeouts.generation(),
            responses: config.responses.clone(),
        })
    }

    /// Replace the built-in BM25 scorer
    pub fn with_lexical_model(mut self, model: Arc<dyn LexicalModel>) -> Self {
        self.lexical = model;
        self
    }

    /// Answer a query
    ///
    /// Never returns an error: every failure is reported through the response's
    /// canned answer and `outcome`.
    pub async fn query(&self, request: QueryRequest) -> QueryResponse {
        let query_id = Uuid::new_v4();

        let response = match self.run(query_id, &request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%query_id, "Query failed: {}", e);
                QueryResponse::canned(&self.responses.query_error, QueryOutcome::Failed)
            }
        };

        Self::enter(query_id, PipelineStage::Idle);
        response
    }

    /// Answer a query with every stage enabled
    pub async fn ask(&self, text: &str) -> QueryResponse {
        self.query(QueryRequest::new(text)).await
    }

    /// Recorded exchanges, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.memory.history()
    }

    pub fn clear_history(&self) {
        self.memory.clear();
        tracing::info!("Conversation history cleared");
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    pub async fn stats(&self) -> Result<SystemStats> {
        let index = self.retriever.store().describe().await?;
        let embeddings = self.retriever.embeddings();

        Ok(SystemStats {
            vector_count: index.vector_count,
            dimension: index.dimension,
            conversation_length: self.memory.len(),
            models: ModelIdentifiers {
                embedding: embeddings.primary_model().to_string(),
                fallback_embedding: embeddings.fallback_model().map(str::to_string),
                reranker: self.reranker.model_name().map(str::to_string),
                generation: self.generator.model_name().to_string(),
            },
        })
    }

    async fn run(&self, query_id: Uuid, request: &QueryRequest) -> Result<QueryResponse> {
        let query = request.text.as_str();

        Self::enter(query_id, PipelineStage::Retrieving);
        let candidates = match self.retriever.retrieve(query, self.fusion.top_k).await {
            StageResult::Ok(candidates) => candidates,
            StageResult::Degraded(candidates, reason) => {
                tracing::debug!(%query_id, "Retrieved with fallback embedding: {}", reason);
                candidates
            }
            StageResult::Failed(reason) => {
                tracing::warn!(%query_id, "Retrieval unavailable: {}", reason);
                return Ok(QueryResponse::canned(
                    &self.responses.no_results,
                    QueryOutcome::RetrievalUnavailable,
                ));
            }
        };

        if candidates.is_empty() {
            tracing::debug!(%query_id, "No candidates retrieved");
            return Ok(self.no_results());
        }

        let candidates = if request.use_hybrid {
            Self::enter(query_id, PipelineStage::Fusing);
            self.fuse_lexical(query, candidates).await?
        } else {
            candidates
        };

        let candidates = if request.use_rerank && self.rerank_enabled {
            Self::enter(query_id, PipelineStage::Reranking);
            match self.reranker.rerank(query, candidates).await {
                StageResult::Ok(candidates) => candidates,
                StageResult::Degraded(candidates, reason) => {
                    tracing::warn!(%query_id, "Re-rank degraded: {}", reason);
                    candidates
                }
                StageResult::Failed(reason) => {
                    return Err(RerankError::RerankingError(reason).into());
                }
            }
        } else {
            candidates
        };

        if candidates.is_empty() {
            tracing::debug!(%query_id, "No candidates above the relevance threshold");
            return Ok(self.no_results());
        }

        Self::enter(query_id, PipelineStage::AssemblingContext);
        let context = self.assembler.pack(&candidates);
        let context_length = context.text.chars().count();
        tracing::debug!(
            %query_id,
            "Context holds {} of {} passages (~{:.0} tokens)",
            context.passages_used,
            candidates.len(),
            context.estimated_tokens
        );

        Self::enter(query_id, PipelineStage::Generating);
        let answer = match self.generate(query, &context.text).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(%query_id, "Generation failed: {}", e);
                return Ok(QueryResponse::canned(
                    &self.responses.generation_error,
                    QueryOutcome::GenerationFailed,
                ));
            }
        };

        Self::enter(query_id, PipelineStage::Recording);
        self.memory
            .append(ConversationTurn::new(query, candidates.clone(), answer.clone()));

        Ok(QueryResponse::with_evidence(
            answer,
            candidates,
            context_length,
            QueryOutcome::Answered,
        ))
    }

    async fn fuse_lexical(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>> {
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let scores = self.lexical.score(query, &texts).await?;

        Ok(fuse(candidates, &scores, &self.fusion)?)
    }

    async fn generate(&self, query: &str, context: &str) -> std::result::Result<String, GenerationError> {
        let request = GenerationRequest {
            system_prompt: self.system_prompt.clone(),
            prior_turns: self
                .memory
                .recent(self.history_turns)
                .iter()
                .map(ExchangePair::from)
                .collect(),
            user_message: build_user_message(context, query),
        };

        let answer = tokio::time::timeout(self.generation_timeout, self.generator.complete(&request))
            .await
            .map_err(|_| GenerationError::Timeout(self.generation_timeout))??;

        if answer.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(answer)
    }

    fn no_results(&self) -> QueryResponse {
        QueryResponse::canned(&self.responses.no_results, QueryOutcome::NoResults)
    }

    fn enter(query_id: Uuid, stage: PipelineStage) {
        tracing::debug!(%query_id, %stage, "Pipeline stage");
    }
}

impl std::fmt::Debug for RagEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagEngine")
            .field("fusion", &self.fusion)
            .field("assembler", &self.assembler)
            .field("history_turns", &self.history_turns)
            .field("memory_len", &self.memory.len())
            .finish_non_exhaustive()
    }
}
