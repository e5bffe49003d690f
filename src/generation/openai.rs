//! OpenAI-compatible chat completions backend

use super::{GenerationError, GenerationRequest, Generator};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint
///
/// Works with OpenAI, vLLM, Ollama's OpenAI mode and other compatible servers.
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.is_empty() && !config.endpoint.starts_with("http://localhost") {
            return Err(GenerationError::InitializationError(
                "API key required for remote endpoints".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::InitializationError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Build from configuration, reading the API key from the configured variable
    pub fn from_config(config: &GenerationConfig, timeout: Duration) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        Self::new(config, api_key, timeout)
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn build_messages<'a>(request: &'a GenerationRequest) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(2 + request.prior_turns.len() * 2);
        messages.push(ChatMessage {
            role: "system",
            content: &request.system_prompt,
        });
        for turn in &request.prior_turns {
            messages.push(ChatMessage {
                role: "user",
                content: &turn.user,
            });
            messages.push(ChatMessage {
                role: "assistant",
                content: &turn.assistant,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_message,
        });
        messages
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: Self::build_messages(request),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut http = self.client.post(self.chat_url()).json(&body);
        if !self.api_key.is_empty() {
            http = http.bearer_auth(&self.api_key);
        }

        let response = http
            .send()
            .await
            .map_err(|e| GenerationError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("No choices in response".to_string()))?;

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
