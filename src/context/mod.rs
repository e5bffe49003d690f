//! Token-budgeted context assembly
//!
//! Packs ranked passages, best first, into the context string handed to the
//! generator. Each passage is attributed with a `[Source: ...]` header and passages
//! are separated by a blank line. Passages are never cut: packing stops at the first
//! passage that does not fit the remaining budget.

use crate::config::ContextConfig;
use crate::retrieval::SearchResult;

/// Result of packing passages under a budget
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub text: String,
    /// Number of leading passages included
    pub passages_used: usize,
    pub estimated_tokens: f64,
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_tokens: usize,
    tokens_per_word: f64,
}

impl ContextAssembler {
    pub fn new(max_tokens: usize, tokens_per_word: f64) -> Self {
        Self {
            max_tokens,
            tokens_per_word,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.max_tokens, config.tokens_per_word)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Estimated token count: whitespace-separated words times the per-word ratio
    pub fn estimate_tokens(&self, text: &str) -> f64 {
        text.split_whitespace().count() as f64 * self.tokens_per_word
    }

    /// Assemble the context string
    pub fn assemble(&self, results: &[SearchResult]) -> String {
        self.pack(results).text
    }

    /// Assemble and report how much of the budget was used
    ///
    /// Each passage is charged for its own text; the `[Source: ...]` headers are not
    /// counted against `max_tokens`.
    pub fn pack(&self, results: &[SearchResult]) -> AssembledContext {
        let mut blocks: Vec<String> = Vec::new();
        let mut used = 0.0;

        for result in results {
            let cost = self.estimate_tokens(&result.text);

            if used + cost > self.max_tokens as f64 {
                tracing::debug!(
                    "Context budget of {} tokens reached after {} passages",
                    self.max_tokens,
                    blocks.len()
                );
                break;
            }

            used += cost;
            blocks.push(format!("[Source: {}]\n{}", result.source, result.text));
        }

        AssembledContext {
            passages_used: blocks.len(),
            text: blocks.join("\n\n"),
            estimated_tokens: used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, words: usize, source: &str) -> SearchResult {
        let text = vec!["word"; words].join(" ");
        SearchResult::new(id, text, 0.5, source)
    }

    #[test]
    fn test_format_and_separator() {
        let assembler = ContextAssembler::new(4000, 1.3);
        let results = vec![
            SearchResult::new("a", "Article 1. Scope", 0.9, "civil_code.txt"),
            SearchResult::new("b", "Article 2. Terms", 0.8, "tax_code.txt"),
        ];

        assert_eq!(
            assembler.assemble(&results),
            "[Source: civil_code.txt]\nArticle 1. Scope\n\n[Source: tax_code.txt]\nArticle 2. Terms"
        );
    }

    #[test]
    fn test_all_included_under_budget() {
        let assembler = ContextAssembler::new(4000, 1.3);
        let results: Vec<_> = (0..5)
            .map(|i| passage(&i.to_string(), 100, "code.txt"))
            .collect();

        let packed = assembler.pack(&results);
        assert_eq!(packed.passages_used, 5);
    }

    #[test]
    fn test_budget_is_respected() {
        let assembler = ContextAssembler::new(100, 1.3);
        let results: Vec<_> = (0..10)
            .map(|i| passage(&i.to_string(), 20, "code.txt"))
            .collect();

        let packed = assembler.pack(&results);
        assert!(packed.estimated_tokens <= 100.0);
        // 26 tokens per passage: 3 passages = 78, 4 = 104
        assert_eq!(packed.passages_used, 3);
        assert!((packed.estimated_tokens - 78.0).abs() < 1e-9);
    }

    #[test]
    fn test_passage_just_under_budget_is_included() {
        let assembler = ContextAssembler::new(100, 1.3);

        // 75 words = 97.5 tokens
        let packed = assembler.pack(&[passage("fits", 75, "civil_code.txt")]);
        assert_eq!(packed.passages_used, 1);
        assert!(packed.text.starts_with("[Source: civil_code.txt]\n"));

        // 77 words = 100.1 tokens
        let packed = assembler.pack(&[passage("over", 77, "civil_code.txt")]);
        assert_eq!(packed.passages_used, 0);
        assert!(packed.text.is_empty());
    }

    #[test]
    fn test_oversized_passage_stops_packing() {
        let assembler = ContextAssembler::new(100, 1.3);
        let results = vec![
            passage("small", 10, "a.txt"),
            passage("huge", 500, "b.txt"),
            passage("after", 5, "c.txt"),
        ];

        let text = assembler.assemble(&results);
        assert!(text.contains("[Source: a.txt]"));
        assert!(!text.contains("[Source: b.txt]"));
        assert!(!text.contains("[Source: c.txt]"));
    }

    #[test]
    fn test_no_partial_passages() {
        let assembler = ContextAssembler::new(60, 1.3);
        let results = vec![
            SearchResult::new("a", "one two three four five", 0.9, "a.txt"),
            SearchResult::new("b", vec!["long"; 50].join(" "), 0.8, "b.txt"),
        ];

        let text = assembler.assemble(&results);
        assert!(text.contains("one two three four five"));
        assert!(!text.contains("long"));
    }

    #[test]
    fn test_empty_and_deterministic() {
        let assembler = ContextAssembler::new(4000, 1.3);
        assert_eq!(assembler.assemble(&[]), "");

        let results = vec![passage("a", 3, "a.txt"), passage("b", 4, "b.txt")];
        assert_eq!(assembler.assemble(&results), assembler.assemble(&results));
    }
}
