//! legal-rag - Hybrid retrieval-augmented question answering over legal texts
//!
//! Dense vector retrieval finds candidate passages, BM25 re-scores them, a weighted
//! fusion and a cross-encoder re-rank pick the best evidence, and a token-budgeted
//! context is handed to a language model together with recent conversation turns.

pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod memory;
pub mod outcome;
pub mod pipeline;
pub mod retrieval;
pub mod telemetry;

pub use error::{RagError, Result};
pub use pipeline::{QueryOutcome, QueryRequest, QueryResponse, RagEngine};
