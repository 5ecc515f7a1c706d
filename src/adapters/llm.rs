use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_name: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// One round trip: the whole conversation so far and how many independent
/// candidates to ask for.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub choices: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable settings; only surfaces before the first request.
    Configuration,
    /// The request itself failed and may be retried as-is.
    Request,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Please set your OPENAI_API_KEY environment variable to use the OpenAI API.")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{0}")]
    Transport(#[source] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("API response contained no choices")]
    EmptyResponse,
}

impl CompletionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingApiKey | Self::Client(_) => ErrorKind::Configuration,
            Self::Transport(_) | Self::Api { .. } | Self::EmptyResponse => ErrorKind::Request,
        }
    }
}

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    /// Returns the trimmed candidate texts in the order the provider sent them.
    async fn complete(&self, request: &ChatRequest) -> Result<Vec<String>, CompletionError>;
    fn model_name(&self) -> &str;
}

/// Looks up the API key, preferring the environment over the config file.
pub fn resolve_api_key(configured: Option<&str>) -> Option<String> {
    pick_api_key(std::env::var(API_KEY_ENV).ok(), configured)
}

fn pick_api_key(from_env: Option<String>, configured: Option<&str>) -> Option<String> {
    let usable = |key: &String| !key.trim().is_empty();
    from_env
        .filter(usable)
        .or_else(|| configured.map(str::to_string).filter(usable))
}

pub fn create_adapter(config: &ModelConfig) -> Result<Box<dyn LLMAdapter>, CompletionError> {
    Ok(Box::new(crate::adapters::OpenAIAdapter::new(config.clone())?))
}
