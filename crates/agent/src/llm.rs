use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use shopdesk_core::config::LlmConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Body of an OpenAI-compatible `/chat/completions` call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("llm client misconfigured: {0}")]
    Configuration(String),
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm returned an empty completion")]
    EmptyCompletion,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// Chat-completions client for Groq, OpenAI, Ollama, or any server speaking
/// the same protocol.
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GenerationError::Configuration(error.to_string()))?;

        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string(), api_key })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        Self::new(
            config.effective_base_url(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response =
            builder.send().await.map_err(|error| GenerationError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status: status.as_u16(), body });
        }

        let body: CompletionResponse =
            response.json().await.map_err(|error| GenerationError::Decode(error.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Decode("no choices in response".to_string()))
    }
}

/// Fixed sampling parameters for every reply.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { model: "llama3-8b-8192".to_string(), max_tokens: 500, temperature: 0.7 }
    }
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Clone)]
pub struct ResponseGenerator {
    client: Arc<dyn LlmClient>,
    settings: GenerationSettings,
}

impl ResponseGenerator {
    pub fn new(client: Arc<dyn LlmClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// One completion attempt. The trimmed text, or an error for the caller to
    /// replace with a fallback reply.
    pub async fn generate(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        debug!(
            event_name = "agent.generate.request",
            model = %request.model,
            max_tokens = request.max_tokens,
            "requesting completion"
        );
        let text = self.client.complete(&request).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }
        Ok(trimmed.to_string())
    }
}
