use crate::config::{parse_duration, Config};
use crate::error::{RagError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_rerank(config, &mut errors);
        Self::validate_context(config, &mut errors);
        Self::validate_memory(config, &mut errors);
        Self::validate_generation(config, &mut errors);
        Self::validate_timeouts(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RagError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.primary_model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.primary_model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.fallback_model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.fallback_model",
                "Model name cannot be empty",
            ));
        }

        // Both embedding paths must land in the same vector space as the index
        if let Some(dimensions) = config.embedding.dimensions {
            if dimensions != config.index.dimension {
                errors.push(ValidationError::new(
                    "embedding.dimensions",
                    format!(
                        "Requested dimensions {} do not match index dimension {}",
                        dimensions, config.index.dimension
                    ),
                ));
            }
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.index.dimension == 0 {
            errors.push(ValidationError::new(
                "index.dimension",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.index.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.index.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.index.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.top_k_initial == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k_initial",
                "top_k_initial must be greater than 0",
            ));
        }

        let alpha = config.retrieval.alpha;
        if !(0.0..=1.0).contains(&alpha) {
            errors.push(ValidationError::new(
                "retrieval.alpha",
                format!("Alpha must be between 0.0 and 1.0, got {}", alpha),
            ));
        }
    }

    fn validate_rerank(config: &Config, errors: &mut Vec<ValidationError>) {
        if !config.rerank.threshold.is_finite() {
            errors.push(ValidationError::new(
                "rerank.threshold",
                "Threshold must be a finite number",
            ));
        }

        if config.rerank.top_k_final == 0 {
            errors.push(ValidationError::new(
                "rerank.top_k_final",
                "top_k_final must be greater than 0",
            ));
        }

        if config.rerank.enabled && config.rerank.model.is_empty() {
            errors.push(ValidationError::new(
                "rerank.model",
                "Model name cannot be empty when re-ranking is enabled",
            ));
        }
    }

    fn validate_context(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.context.max_tokens == 0 {
            errors.push(ValidationError::new(
                "context.max_tokens",
                "Token budget must be greater than 0",
            ));
        }

        let ratio = config.context.tokens_per_word;
        if !(ratio.is_finite() && ratio > 0.0) {
            errors.push(ValidationError::new(
                "context.tokens_per_word",
                format!("Tokens per word must be positive, got {}", ratio),
            ));
        }
    }

    fn validate_memory(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.memory.capacity == 0 {
            errors.push(ValidationError::new(
                "memory.capacity",
                "Capacity must be greater than 0",
            ));
        }

        if config.memory.history_turns > config.memory.capacity {
            errors.push(ValidationError::new(
                "memory.history_turns",
                format!(
                    "history_turns ({}) cannot exceed capacity ({})",
                    config.memory.history_turns, config.memory.capacity
                ),
            ));
        }
    }

    fn validate_generation(config: &Config, errors: &mut Vec<ValidationError>) {
        let temp = config.generation.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "generation.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if config.generation.max_tokens == 0 {
            errors.push(ValidationError::new(
                "generation.max_tokens",
                "max_tokens must be greater than 0",
            ));
        }

        if config.generation.model.is_empty() {
            errors.push(ValidationError::new(
                "generation.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_timeouts(config: &Config, errors: &mut Vec<ValidationError>) {
        let timeouts = [
            ("timeouts.embedding", &config.timeouts.embedding),
            ("timeouts.index", &config.timeouts.index),
            ("timeouts.rerank", &config.timeouts.rerank),
            ("timeouts.generation", &config.timeouts.generation),
        ];

        for (path, value) in timeouts {
            match parse_duration(value) {
                Some(d) if !d.is_zero() => {}
                _ => errors.push(ValidationError::new(
                    path,
                    format!("Invalid duration format: {}", value),
                )),
            }
        }
    }
}
