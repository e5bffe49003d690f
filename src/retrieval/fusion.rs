//! Weighted fusion of dense similarity and lexical relevance

use crate::retrieval::SearchResult;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FusionError {
    #[error("Invalid alpha {0}: must be within [0, 1]")]
    InvalidAlpha(f32),

    #[error("top_k must be greater than 0")]
    InvalidTopK,

    #[error("Got {scores} lexical scores for {results} results")]
    LengthMismatch { results: usize, scores: usize },
}

/// Configuration for fusion
#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    /// Weight of the dense score; the lexical score gets `1 - alpha`
    pub alpha: f32,

    /// Number of results kept after sorting
    pub top_k: usize,
}

impl FusionConfig {
    pub fn new(alpha: f32, top_k: usize) -> Result<Self, FusionError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(FusionError::InvalidAlpha(alpha));
        }
        if top_k == 0 {
            return Err(FusionError::InvalidTopK);
        }

        Ok(Self { alpha, top_k })
    }
}

/// Min-max normalize scores into [0, 1]
///
/// When every score is equal (including a single score) there is no spread to
/// normalize and every entry maps to 0.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    if !(range > 0.0) {
        return vec![0.0; scores.len()];
    }

    scores.iter().map(|s| (s - min) / range).collect()
}

/// Fuse dense results with a parallel list of lexical scores
///
/// combined = alpha * dense + (1 - alpha) * normalized_lexical
///
/// `results` must be in dense rank order: the sort is stable, so equal combined
/// scores keep their dense rank.
///
/// # Returns
/// Re-scored results sorted by combined score descending, truncated to `top_k`
pub fn fuse(
    mut results: Vec<SearchResult>,
    lexical_scores: &[f32],
    config: &FusionConfig,
) -> Result<Vec<SearchResult>, FusionError> {
    if results.len() != lexical_scores.len() {
        return Err(FusionError::LengthMismatch {
            results: results.len(),
            scores: lexical_scores.len(),
        });
    }

    let normalized = min_max_normalize(lexical_scores);

    for ((result, raw), norm) in results.iter_mut().zip(lexical_scores).zip(&normalized) {
        let combined = config.alpha * result.stage_scores.dense + (1.0 - config.alpha) * norm;
        result.set_lexical(*raw);
        result.set_fused(combined);
    }

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(config.top_k);

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(scores: &[f32]) -> Vec<SearchResult> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| SearchResult::new(format!("cand{}", i + 1), "text", *s, "code.txt"))
            .collect()
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_weighted_fusion_reorders() {
        let config = FusionConfig::new(0.75, 10).unwrap();
        let fused = fuse(candidates(&[0.9, 0.7, 0.5]), &[0.2, 0.8, 0.5], &config).unwrap();

        assert_eq!(ids(&fused), vec!["cand2", "cand1", "cand3"]);
        assert!((fused[0].score - 0.775).abs() < 1e-5);
        assert!((fused[1].score - 0.675).abs() < 1e-5);
        assert!((fused[2].score - 0.5).abs() < 1e-5);

        assert_eq!(fused[0].stage_scores.dense, 0.7);
        assert_eq!(fused[0].stage_scores.lexical, Some(0.8));
    }

    #[test]
    fn test_normalize_equal_scores_map_to_zero() {
        assert_eq!(min_max_normalize(&[3.0, 3.0, 3.0]), vec![0.0, 0.0, 0.0]);
        assert_eq!(min_max_normalize(&[1.5]), vec![0.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn test_ties_keep_dense_rank() {
        let config = FusionConfig::new(0.75, 10).unwrap();
        // Equal lexical scores normalize to zero, so dense order decides, and equal
        // dense scores must keep their input order
        let fused = fuse(candidates(&[0.6, 0.6, 0.8, 0.6]), &[1.0, 1.0, 1.0, 1.0], &config).unwrap();
        assert_eq!(ids(&fused), vec!["cand3", "cand1", "cand2", "cand4"]);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let config = FusionConfig::new(0.5, 10).unwrap();
        let dense = [0.4, 0.9, 0.4, 0.1, 0.7];
        let lexical = [2.0, 0.0, 2.0, 5.0, 1.0];

        let first = fuse(candidates(&dense), &lexical, &config).unwrap();
        for _ in 0..5 {
            let again = fuse(candidates(&dense), &lexical, &config).unwrap();
            assert_eq!(ids(&first), ids(&again));
        }
    }

    #[test]
    fn test_truncates_to_top_k() {
        let config = FusionConfig::new(0.75, 2).unwrap();
        let fused = fuse(candidates(&[0.9, 0.7, 0.5]), &[0.0, 0.0, 1.0], &config).unwrap();
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_length_mismatch() {
        let config = FusionConfig::new(0.75, 10).unwrap();
        let result = fuse(candidates(&[0.9, 0.7]), &[1.0], &config);
        assert_eq!(
            result.unwrap_err(),
            FusionError::LengthMismatch {
                results: 2,
                scores: 1
            }
        );
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(
            FusionConfig::new(1.2, 5).unwrap_err(),
            FusionError::InvalidAlpha(1.2)
        );
        assert_eq!(FusionConfig::new(0.5, 0).unwrap_err(), FusionError::InvalidTopK);
    }
}
