//! Answer generation interface
//!
//! The pipeline hands the generator a fully formed prompt: a system prompt, prior
//! exchanges, and a user message embedding the assembled context. It never inspects
//! how the answer is produced.

mod openai;

pub use openai::OpenAiGenerator;

use crate::memory::ConversationTurn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generator initialization failed: {0}")]
    InitializationError(String),

    #[error("Request failed: {0}")]
    RequestError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generator returned an empty answer")]
    EmptyResponse,

    #[error("Generation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A prior user/assistant exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangePair {
    pub user: String,
    pub assistant: String,
}

impl From<&ConversationTurn> for ExchangePair {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            user: turn.user_query.clone(),
            assistant: turn.generated_response.clone(),
        }
    }
}

/// Everything a generator receives for one answer
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    /// Oldest first
    pub prior_turns: Vec<ExchangePair>,
    pub user_message: String,
}

/// Label preceding the assembled context in the user message
pub const CONTEXT_LABEL: &str = "Контекст:";
/// Label preceding the user's question
pub const QUESTION_LABEL: &str = "Вопрос:";

/// Format the final user message from context and question
pub fn build_user_message(context: &str, query: &str) -> String {
    format!("{}\n{}\n\n{} {}", CONTEXT_LABEL, context, QUESTION_LABEL, query)
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}
