//! Query orchestration
//!
//! `RagEngine` drives one query through retrieval, optional lexical fusion, optional
//! re-ranking, context assembly and generation, then records the exchange in
//! conversation memory.

mod engine;
pub mod factory;

pub use engine::{EngineParts, RagEngine};

use crate::retrieval::SearchResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum characters of passage text returned in `QueryResponse::search_results`
pub const RESULT_PREVIEW_CHARS: usize = 200;

/// One user query and its stage toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    /// Re-score dense candidates with BM25 and fuse
    pub use_hybrid: bool,
    /// Re-rank and threshold-filter with the relevance model
    pub use_rerank: bool,
}

impl QueryRequest {
    /// A request with every stage enabled
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            use_hybrid: true,
            use_rerank: true,
        }
    }

    pub fn with_hybrid(mut self, enabled: bool) -> Self {
        self.use_hybrid = enabled;
        self
    }

    pub fn with_rerank(mut self, enabled: bool) -> Self {
        self.use_rerank = enabled;
        self
    }
}

/// How a query ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// A generated answer was returned and recorded
    Answered,
    /// No candidate survived retrieval or re-rank filtering
    NoResults,
    /// Neither embedding path nor the vector index could be used
    RetrievalUnavailable,
    /// Generation failed, timed out or returned empty text
    GenerationFailed,
    /// Any other stage failure
    Failed,
}

impl QueryOutcome {
    pub fn is_answered(self) -> bool {
        self == QueryOutcome::Answered
    }
}

/// Answer returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    /// Source label of each passage the answer was built from, in rank order
    pub sources: Vec<String>,
    /// Passages with text shortened to `RESULT_PREVIEW_CHARS`
    pub search_results: Vec<SearchResult>,
    /// Length of the assembled context in characters
    pub context_length: usize,
    pub results_count: usize,
    pub outcome: QueryOutcome,
}

impl QueryResponse {
    /// A canned answer carrying no evidence
    pub fn canned(answer: impl Into<String>, outcome: QueryOutcome) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            search_results: Vec::new(),
            context_length: 0,
            results_count: 0,
            outcome,
        }
    }

    fn with_evidence(
        answer: impl Into<String>,
        results: Vec<SearchResult>,
        context_length: usize,
        outcome: QueryOutcome,
    ) -> Self {
        Self {
            answer: answer.into(),
            sources: results.iter().map(|r| r.source.clone()).collect(),
            results_count: results.len(),
            search_results: results
                .into_iter()
                .map(|mut r| {
                    r.text = r.preview(RESULT_PREVIEW_CHARS);
                    r
                })
                .collect(),
            context_length,
            outcome,
        }
    }
}

/// Stages a query moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Retrieving,
    Fusing,
    Reranking,
    AssemblingContext,
    Generating,
    Recording,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Fusing => "fusing",
            PipelineStage::Reranking => "reranking",
            PipelineStage::AssemblingContext => "assembling_context",
            PipelineStage::Generating => "generating",
            PipelineStage::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// Model names in use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelIdentifiers {
    pub embedding: String,
    pub fallback_embedding: Option<String>,
    pub reranker: Option<String>,
    pub generation: String,
}

/// System summary for status views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub vector_count: u64,
    pub dimension: usize,
    pub conversation_length: usize,
    pub models: ModelIdentifiers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = QueryRequest::new("What is a contract?");
        assert!(request.use_hybrid);
        assert!(request.use_rerank);

        let dense_only = request.with_hybrid(false).with_rerank(false);
        assert!(!dense_only.use_hybrid);
        assert!(!dense_only.use_rerank);
    }

    #[test]
    fn test_response_sources_follow_results() {
        let results = vec![
            SearchResult::new("a", "text", 0.9, "civil_code.txt"),
            SearchResult::new("b", "text", 0.8, "civil_code.txt"),
            SearchResult::new("c", "text", 0.7, "tax_code.txt"),
        ];
        let response = QueryResponse::with_evidence("answer", results, 42, QueryOutcome::Answered);

        assert_eq!(
            response.sources,
            vec!["civil_code.txt", "civil_code.txt", "tax_code.txt"]
        );
        assert_eq!(response.results_count, 3);
        assert_eq!(response.context_length, 42);
    }

    #[test]
    fn test_response_text_is_shortened() {
        let long = "а".repeat(300);
        let results = vec![
            SearchResult::new("a", long, 0.9, "civil_code.txt"),
            SearchResult::new("b", "short", 0.8, "civil_code.txt"),
        ];
        let response = QueryResponse::with_evidence("answer", results, 10, QueryOutcome::Answered);

        let excerpt = &response.search_results[0].text;
        assert_eq!(excerpt.chars().count(), RESULT_PREVIEW_CHARS + 3);
        assert!(excerpt.ends_with("..."));
        assert_eq!(response.search_results[1].text, "short");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&QueryOutcome::RetrievalUnavailable).unwrap();
        assert_eq!(json, "\"retrieval_unavailable\"");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::AssemblingContext.to_string(), "assembling_context");
    }
}
