//! Hybrid Retrieval & Re-ranking
//!
//! Dense retrieval produces the candidate set; BM25 re-scores those same candidates;
//! a weighted fusion merges both signals, and a cross-encoder re-ranks and filters
//! the shortlist.

mod dense;
mod fusion;
mod lexical;
mod reranker;
mod result;

pub use dense::DenseRetriever;
pub use fusion::{fuse, min_max_normalize, FusionConfig, FusionError};
pub use lexical::{Bm25Model, LexicalError, LexicalModel, LexicalScorer};
pub use reranker::{FastEmbedReranker, RelevanceModel, RerankError, Reranker};
pub use result::{SearchResult, StageScores, UNKNOWN_SOURCE};
