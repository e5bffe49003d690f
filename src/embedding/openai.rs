//! OpenAI-compatible remote embeddings

use super::{EmbeddingError, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let model = model.into();
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(EmbeddingError::InitializationError(
                "API key cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        let dimension = dimensions.unwrap_or_else(|| native_dimension(&model));

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model,
            dimensions,
            dimension,
        })
    }

    /// Build from configuration, reading the API key from the configured variable
    pub fn from_config(config: &EmbeddingConfig, timeout: Duration) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            EmbeddingError::InitializationError(format!(
                "Environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        Self::new(
            config.endpoint.clone(),
            api_key,
            config.primary_model.clone(),
            config.dimensions,
            timeout,
        )
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.endpoint.trim_end_matches('/'))
    }
}

fn native_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let request = EmbedRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::GenerationError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::GenerationError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::GenerationError("No embeddings returned".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_resolution() {
        let timeout = Duration::from_secs(1);
        let truncated = OpenAiEmbedder::new(
            "https://api.openai.com/v1/",
            "sk-test",
            "text-embedding-3-small",
            Some(384),
            timeout,
        )
        .unwrap();
        assert_eq!(truncated.dimension(), 384);
        assert_eq!(
            truncated.embeddings_url(),
            "https://api.openai.com/v1/embeddings"
        );

        let native =
            OpenAiEmbedder::new("http://localhost:8080", "sk-test", "text-embedding-3-large", None, timeout)
                .unwrap();
        assert_eq!(native.dimension(), 3072);
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = OpenAiEmbedder::new(
            "https://api.openai.com/v1",
            "",
            "text-embedding-3-small",
            None,
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_request_omits_unset_dimensions() {
        let request = EmbedRequest {
            model: "text-embedding-3-small",
            input: "statute of limitations",
            dimensions: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("dimensions").is_none());
        assert_eq!(json["input"], "statute of limitations");
    }
}
