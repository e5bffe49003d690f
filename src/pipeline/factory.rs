//! Build an engine from configuration

use super::{EngineParts, RagEngine};
use crate::config::{Config, ConfigValidator};
use crate::embedding::{EmbeddingChain, EmbeddingProvider, FastEmbedProvider, OpenAiEmbedder};
use crate::error::Result;
use crate::generation::{Generator, OpenAiGenerator};
use crate::index::VectorStore;
use crate::memory::ConversationMemory;
use crate::retrieval::{DenseRetriever, FastEmbedReranker, RelevanceModel};
use std::sync::Arc;

/// Assemble the default collaborators around an existing vector store
///
/// The hosted embedder is primary only when its API key variable is set; otherwise
/// the local model serves alone. A reranker that fails to load leaves re-ranking in
/// its degraded pass-through mode instead of failing the build.
pub fn build_engine(
    config: &Config,
    store: Arc<dyn VectorStore>,
    memory: Arc<ConversationMemory>,
) -> Result<RagEngine> {
    ConfigValidator::validate(config)?;

    let embeddings = build_embeddings(config)?;
    let retriever = DenseRetriever::new(embeddings, store, config.timeouts.index());

    let relevance_model: Option<Arc<dyn RelevanceModel>> = if config.rerank.enabled {
        match FastEmbedReranker::new(&config.rerank.model) {
            Ok(model) => Some(Arc::new(model)),
            Err(e) => {
                tracing::warn!("Reranker unavailable, continuing without it: {}", e);
                None
            }
        }
    } else {
        None
    };

    let generator: Arc<dyn Generator> = Arc::new(OpenAiGenerator::from_config(
        &config.generation,
        config.timeouts.generation(),
    )?);

    RagEngine::new(
        config,
        EngineParts {
            retriever,
            relevance_model,
            generator,
            memory,
        },
    )
}

fn build_embeddings(config: &Config) -> Result<EmbeddingChain> {
    let dimension = config.index.dimension;
    let timeout = config.timeouts.embedding();
    let local: Arc<dyn EmbeddingProvider> =
        Arc::new(FastEmbedProvider::new(&config.embedding.fallback_model)?);

    match OpenAiEmbedder::from_config(&config.embedding, timeout) {
        Ok(hosted) => {
            tracing::info!(
                "Embedding with {} (fallback {})",
                config.embedding.primary_model,
                config.embedding.fallback_model
            );
            Ok(EmbeddingChain::new(Arc::new(hosted), dimension, timeout).with_fallback(local))
        }
        Err(e) => {
            tracing::info!(
                "Hosted embeddings unavailable ({}), using {} only",
                e,
                config.embedding.fallback_model
            );
            Ok(EmbeddingChain::new(local, dimension, timeout))
        }
    }
}
