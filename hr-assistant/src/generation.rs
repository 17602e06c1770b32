//! Chat-completion collaborator.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("chat completion request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat completion returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("could not decode chat completion response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("chat completion returned no answer text")]
    EmptyResponse,

    #[error("invalid generation configuration: {message}")]
    Config { message: String },
}

/// One prompt to complete.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// `None` leaves the provider default
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Turns a prompt into generated text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// OpenAI-compatible `/chat/completions` client.
///
/// The prompt is sent as a single user message, with no system message.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(
        api_key: &str,
        model: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GenerationError::Config {
                message: "an OpenAI API key is required (set OPENAI_API_KEY)".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {api_key}");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| GenerationError::Config {
                message: "invalid OpenAI API key".to_string(),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[async_trait]
impl GenerativeModel for OpenAiChatModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        tracing::debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.model,
            request.prompt.chars().count()
        );
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = resp.json().await.map_err(GenerationError::Decode)?;
        first_answer(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Refusals, content-filter stops and tool calls come back with null or blank content
fn first_answer(parsed: ChatResponse) -> Result<String, GenerationError> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
