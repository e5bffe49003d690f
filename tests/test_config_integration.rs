//! Configuration file loading against hand-written TOML

use legal_rag::config::{Config, LexicalLanguage};
use legal_rag::RagError;
use std::time::Duration;
use tempfile::TempDir;

const MINIMAL: &str = r#"
[_meta]
schema_version = "1.0.0"

[embedding]
primary_model = "text-embedding-3-small"
endpoint = "https://api.openai.com/v1"
api_key_env = "OPENAI_API_KEY"
dimensions = 384
fallback_model = "multilingual-e5-small"

[index]
dimension = 384
hnsw_m = 16
hnsw_ef_construction = 200
hnsw_ef_search = 64
max_elements = 50000

[retrieval]
top_k_initial = 30
alpha = 0.6

[rerank]
enabled = true
model = "bge-reranker-v2-m3"
threshold = 0.2
top_k_final = 4

[context]
max_tokens = 3000
tokens_per_word = 1.3

[memory]
capacity = 8
history_turns = 2

[generation]
endpoint = "http://localhost:11434/v1"
api_key_env = "OPENAI_API_KEY"
model = "llama3"
temperature = 0.1
max_tokens = 800
system_prompt = "Answer from the context only."
"#;

fn write_config(temp: &TempDir, content: &str) -> std::path::PathBuf {
    let path = temp.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_minimal_file_uses_section_defaults() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, MINIMAL);

    let config = Config::load(&path).unwrap();

    assert_eq!(config.retrieval.top_k_initial, 30);
    assert_eq!(config.rerank.model, "bge-reranker-v2-m3");
    assert_eq!(config.memory.history_turns, 2);
    assert_eq!(config.lexical.language, LexicalLanguage::Russian);
    assert_eq!(config.timeouts.generation(), Duration::from_secs(60));
    assert_eq!(
        config.responses.no_results,
        Config::default().responses.no_results
    );
}

#[test]
fn test_optional_sections() {
    let temp = TempDir::new().unwrap();
    let content = format!(
        "{}\n[lexical]\nlanguage = \"russian\"\n\n[timeouts]\nembedding = \"2s\"\nindex = \"500ms\"\nrerank = \"5s\"\ngeneration = \"1m\"\n\n[responses]\nno_results = \"Nothing found.\"\ngeneration_error = \"Generation failed.\"\nquery_error = \"Request failed.\"\n",
        MINIMAL
    );
    let path = write_config(&temp, &content);

    let config = Config::load(&path).unwrap();

    assert_eq!(config.lexical.language, LexicalLanguage::Russian);
    assert_eq!(config.timeouts.index(), Duration::from_millis(500));
    assert_eq!(config.timeouts.generation(), Duration::from_secs(60));
    assert_eq!(config.responses.no_results, "Nothing found.");
}

#[test]
fn test_invalid_values_are_all_reported() {
    let temp = TempDir::new().unwrap();
    let content = MINIMAL
        .replace("alpha = 0.6", "alpha = 1.4")
        .replace("top_k_final = 4", "top_k_final = 0")
        .replace("max_tokens = 3000", "max_tokens = 0");
    let path = write_config(&temp, &content);

    match Config::load(&path) {
        Err(RagError::ConfigValidation { errors }) => {
            let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
            assert!(paths.contains(&"retrieval.alpha"));
            assert!(paths.contains(&"rerank.top_k_final"));
            assert!(paths.contains(&"context.max_tokens"));
        }
        other => panic!("Expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_malformed_toml() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "[retrieval\nalpha = ");

    assert!(matches!(Config::load(&path), Err(RagError::Toml(_))));
}

#[test]
fn test_default_config_survives_save_and_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("legal-rag").join("config.toml");

    Config::default().save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();

    assert_eq!(loaded.embedding.dimensions, Some(384));
    assert_eq!(loaded.index.dimension, 384);
    assert_eq!(loaded.generation.system_prompt, Config::default().generation.system_prompt);
}
