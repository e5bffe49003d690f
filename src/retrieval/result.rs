//! Retrieved passages and their per-stage scores

use crate::index::{IndexMatch, FILENAME_KEY, SOURCE_KEY, TEXT_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Source label used when a chunk carries no file name
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Score assigned by each pipeline stage
///
/// Stage scores live on different scales (cosine similarity, BM25, a weighted blend,
/// cross-encoder logits) and are only comparable within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StageScores {
    pub dense: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fused: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranked: Option<f32>,
}

/// A retrieved passage candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stable chunk identifier
    pub id: String,

    /// Passage text
    pub text: String,

    /// Score assigned by the most recent stage
    pub score: f32,

    /// Every stage's score, for auditing
    pub stage_scores: StageScores,

    /// Chunk metadata; always contains `source`
    pub metadata: BTreeMap<String, Value>,

    /// Display label for attribution
    pub source: String,
}

impl SearchResult {
    /// Create a candidate straight from dense retrieval
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        dense_score: f32,
        source: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let mut metadata = BTreeMap::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.clone()));

        Self {
            id: id.into(),
            text: text.into(),
            score: dense_score,
            stage_scores: StageScores {
                dense: dense_score,
                ..StageScores::default()
            },
            metadata,
            source,
        }
    }

    /// Build a candidate from a vector index hit
    ///
    /// The source label is the chunk's `filename`, then `source`, then "Unknown".
    pub fn from_match(hit: IndexMatch) -> Self {
        let IndexMatch {
            id,
            score,
            mut metadata,
        } = hit;

        let text = metadata
            .get(TEXT_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let source = metadata
            .get(FILENAME_KEY)
            .or_else(|| metadata.get(SOURCE_KEY))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SOURCE)
            .to_string();

        metadata
            .entry(SOURCE_KEY.to_string())
            .or_insert_with(|| Value::String(source.clone()));

        Self {
            id,
            text,
            score,
            stage_scores: StageScores {
                dense: score,
                ..StageScores::default()
            },
            metadata,
            source,
        }
    }

    pub(crate) fn set_lexical(&mut self, score: f32) {
        self.stage_scores.lexical = Some(score);
    }

    pub(crate) fn set_fused(&mut self, score: f32) {
        self.stage_scores.fused = Some(score);
        self.score = score;
    }

    pub(crate) fn set_reranked(&mut self, score: f32) {
        self.stage_scores.reranked = Some(score);
        self.score = score;
    }

    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }
}
