//! OpenAI-compatible chat completions client.

use super::{CompletionRequest, LanguageModel};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default endpoint root.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// [`LanguageModel`] speaking the `/chat/completions` protocol.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Client for the endpoint rooted at `api_base` (e.g. `https://api.openai.com/v1`).
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a CompletionRequest> for ChatRequest<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_text,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Map an error response to [`LlmError`], separating token limits from the rest.
fn classify_error(status: u16, body: &str) -> LlmError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return LlmError::Api {
            status,
            message: body.trim().to_string(),
        };
    };
    let error = envelope.error;

    let token_rate_limit = error.code.as_deref() == Some("rate_limit_exceeded")
        && error.kind.as_deref() == Some("tokens");
    let context_overflow = error.code.as_deref() == Some("context_length_exceeded");

    if token_rate_limit || context_overflow {
        LlmError::ModelLimit(error.message)
    } else {
        LlmError::Api {
            status,
            message: error.message,
        }
    }
}

fn extract_content(response: ChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(LlmError::EmptyResponse)
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        tracing::debug!(model = %request.model, "Requesting completion");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&ChatRequest::from(request))
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;
        extract_content(body)
    }
}
