//! The language model behind question answering.
//!
//! The model is a plain text-in, text-out service. The one thing callers
//! need to tell apart is [`LlmError::ModelLimit`], which means "ask again
//! with less".

use crate::error::LlmError;
use async_trait::async_trait;

mod openai;

pub use openai::{OpenAiClient, DEFAULT_API_BASE};

/// One chat completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Instructions given to the model as the system message.
    pub system_prompt: String,
    /// The user message.
    pub user_text: String,
    /// Model name, e.g. `gpt-4`.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap.
    pub max_tokens: u32,
}

/// Text completion service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `request`, returning the reply with surrounding whitespace trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ModelLimit`] for token or rate limits and another
    /// [`LlmError`] for everything else.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
