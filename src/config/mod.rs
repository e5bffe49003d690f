//! Configuration management
//!
//! Every tunable of the pipeline (fusion weight, re-rank threshold, context budget,
//! memory capacity, per-call timeouts) lives here so deployments can adjust them
//! without code changes.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Environment variable prefix for overrides, e.g. `LEGAL_RAG_RETRIEVAL__ALPHA=0.6`
pub const ENV_PREFIX: &str = "LEGAL_RAG_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub lexical: LexicalConfig,
    pub rerank: RerankConfig,
    pub context: ContextConfig,
    pub memory: MemoryConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub responses: ResponsesConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Query embedding: remote primary provider plus a local fallback model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Remote model used first (OpenAI-compatible `/embeddings`)
    pub primary_model: String,
    pub endpoint: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Requested output dimension for the primary model, when it supports truncation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    /// Local fastembed model used when the primary provider fails
    pub fallback_model: String,
}

/// In-process HNSW vector store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub dimension: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
    pub max_elements: usize,
}

/// Candidate retrieval and fusion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of candidates requested from the vector index
    pub top_k_initial: usize,
    /// Weight of the dense score in fusion; lexical gets `1 - alpha`
    pub alpha: f32,
}

/// Tokenizer language for the lexical scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LexicalLanguage {
    /// Lowercasing only, no stemming
    None,
    English,
    #[default]
    Russian,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexicalConfig {
    #[serde(default)]
    pub language: LexicalLanguage,
}

/// Cross-encoder re-ranking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    pub enabled: bool,
    pub model: String,
    /// Relevance probability results must score strictly above to survive
    pub threshold: f32,
    pub top_k_final: usize,
}

/// Context assembly budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    pub max_tokens: usize,
    pub tokens_per_word: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub capacity: usize,
    /// Number of most recent turns sent to the generator as prior exchanges
    pub history_turns: usize,
}

/// Answer generation settings (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

/// Per-call timeouts for external collaborators, as duration strings ("500ms", "10s", "2m")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    pub embedding: String,
    pub index: String,
    pub rerank: String,
    pub generation: String,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            embedding: "10s".to_string(),
            index: "10s".to_string(),
            rerank: "30s".to_string(),
            generation: "60s".to_string(),
        }
    }
}

impl TimeoutsConfig {
    pub fn embedding(&self) -> Duration {
        parse_duration(&self.embedding).unwrap_or(Duration::from_secs(10))
    }

    pub fn index(&self) -> Duration {
        parse_duration(&self.index).unwrap_or(Duration::from_secs(10))
    }

    pub fn rerank(&self) -> Duration {
        parse_duration(&self.rerank).unwrap_or(Duration::from_secs(30))
    }

    pub fn generation(&self) -> Duration {
        parse_duration(&self.generation).unwrap_or(Duration::from_secs(60))
    }
}

/// Canned answers returned without (or instead of) a generated one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesConfig {
    pub no_results: String,
    pub generation_error: String,
    pub query_error: String,
}

impl Default for ResponsesConfig {
    fn default() -> Self {
        Self {
            no_results: "К сожалению, не удалось найти релевантную информацию по вашему запросу."
                .to_string(),
            generation_error: "Извините, произошла ошибка при генерации ответа.".to_string(),
            query_error: "Произошла ошибка при обработке запроса.".to_string(),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "Ты — AI-юрист, специализирующийся на казахстанском \
законодательстве. Твоя задача — давать точные, полезные ответы на основе предоставленного \
контекста.\n\
\n\
Правила:\n\
1. Отвечай только на основе предоставленного контекста\n\
2. Если информации недостаточно, честно скажи об этом\n\
3. Цитируй конкретные статьи и положения\n\
4. Объясняй сложные юридические концепции простым языком\n\
5. Всегда указывай источник информации";

/// Parse a duration string such as "250ms", "10s", "2m" or a bare number of seconds
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => s.split_at(pos),
        None => (s, "s"),
    };
    let value: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        _ => None,
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RagError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        std::fs::write(path, content).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: LEGAL_RAG_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    pub(crate) fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "EMBEDDING__PRIMARY_MODEL" => self.embedding.primary_model = value.to_string(),
            "EMBEDDING__ENDPOINT" => self.embedding.endpoint = value.to_string(),
            "EMBEDDING__FALLBACK_MODEL" => self.embedding.fallback_model = value.to_string(),
            "RETRIEVAL__TOP_K_INITIAL" => {
                self.retrieval.top_k_initial = parse_env(path, value)?;
            }
            "RETRIEVAL__ALPHA" => self.retrieval.alpha = parse_env(path, value)?,
            "RERANK__ENABLED" => self.rerank.enabled = parse_env(path, value)?,
            "RERANK__MODEL" => self.rerank.model = value.to_string(),
            "RERANK__THRESHOLD" => self.rerank.threshold = parse_env(path, value)?,
            "RERANK__TOP_K_FINAL" => self.rerank.top_k_final = parse_env(path, value)?,
            "CONTEXT__MAX_TOKENS" => self.context.max_tokens = parse_env(path, value)?,
            "MEMORY__CAPACITY" => self.memory.capacity = parse_env(path, value)?,
            "GENERATION__ENDPOINT" => self.generation.endpoint = value.to_string(),
            "GENERATION__MODEL" => self.generation.model = value.to_string(),
            "GENERATION__TEMPERATURE" => self.generation.temperature = parse_env(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RagError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("legal-rag").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| RagError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            embedding: EmbeddingConfig {
                primary_model: "text-embedding-3-small".to_string(),
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                dimensions: Some(384),
                fallback_model: "all-MiniLM-L6-v2".to_string(),
            },
            index: IndexConfig {
                dimension: 384,
                hnsw_m: 16,
                hnsw_ef_construction: 200,
                hnsw_ef_search: 64,
                max_elements: 100_000,
            },
            retrieval: RetrievalConfig {
                top_k_initial: 20,
                alpha: 0.75,
            },
            lexical: LexicalConfig::default(),
            rerank: RerankConfig {
                enabled: true,
                model: "bge-reranker-base".to_string(),
                threshold: 0.5,
                top_k_final: 5,
            },
            context: ContextConfig {
                max_tokens: 4000,
                tokens_per_word: 1.3,
            },
            memory: MemoryConfig {
                capacity: 10,
                history_turns: 3,
            },
            generation: GenerationConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "gpt-4".to_string(),
                temperature: 0.3,
                max_tokens: 1000,
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            },
            timeouts: TimeoutsConfig::default(),
            responses: ResponsesConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("15"), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration("1h"), None);
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.retrieval.alpha = 0.6;
        config.rerank.top_k_final = 3;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!((loaded.retrieval.alpha - 0.6).abs() < 1e-6);
        assert_eq!(loaded.rerank.top_k_final, 3);
        assert_eq!(loaded.memory.capacity, 10);
    }

    #[test]
    fn test_defaults_target_russian_corpus() {
        let config = Config::default();
        assert_eq!(config.lexical.language, LexicalLanguage::Russian);
        assert!(config.generation.system_prompt.starts_with("Ты — AI-юрист"));
        assert!(config.responses.no_results.starts_with("К сожалению"));
        assert_eq!(
            config.responses.query_error,
            "Произошла ошибка при обработке запроса."
        );
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(&temp.path().join("absent.toml"));
        assert!(matches!(result, Err(RagError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_env_value_parsing() {
        let mut config = Config::default();
        config.set_value_from_env("RETRIEVAL__ALPHA", "0.5").unwrap();
        config.set_value_from_env("RERANK__ENABLED", "false").unwrap();
        assert!((config.retrieval.alpha - 0.5).abs() < 1e-6);
        assert!(!config.rerank.enabled);

        let err = config.set_value_from_env("MEMORY__CAPACITY", "many");
        assert!(matches!(err, Err(RagError::InvalidConfigValue { .. })));
    }

    #[test]
    fn test_timeouts_fall_back_on_bad_strings() {
        let timeouts = TimeoutsConfig {
            embedding: "soon".to_string(),
            ..TimeoutsConfig::default()
        };
        assert_eq!(timeouts.embedding(), Duration::from_secs(10));
        assert_eq!(timeouts.generation(), Duration::from_secs(60));
    }
}
