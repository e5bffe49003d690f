/// Query embedding
///
/// Architecture:
/// - EmbeddingProvider trait for abstraction over backends
/// - OpenAiEmbedder for the remote primary model (OpenAI-compatible API)
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - EmbeddingChain to fall back from the primary to the local model
mod chain;
mod openai;
mod provider;

pub use chain::EmbeddingChain;
pub use openai::OpenAiEmbedder;
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
