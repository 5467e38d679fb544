pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use log::{ info, warn };
use reqwest::Client as HttpClient;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use super::{ LlmConfig, LlmType };
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use crate::models::chat::ChatMessage;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Upstream {
        status: u16,
        body: String,
    },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Transient failures worth one more attempt: timeouts, transport errors,
    /// throttling and provider-side 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Network(_) => true,
            ProviderError::Upstream { status, .. } => *status == 429 || *status >= 500,
            ProviderError::InvalidResponse(_) => false,
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions
    ) -> Result<CompletionResponse, ProviderError>;

    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
}

pub(crate) fn build_http_client() -> Result<HttpClient, reqwest::Error> {
    HttpClient::builder().connect_timeout(CONNECT_TIMEOUT).build()
}

pub(crate) async fn ensure_success(
    resp: reqwest::Response
) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::Upstream { status: status.as_u16(), body })
}

pub(crate) fn non_empty_reply(content: Option<String>) -> Result<String, ProviderError> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ProviderError::InvalidResponse("empty completion".to_string())),
    }
}

/// Builds the configured chat client. `Ok(None)` means the provider needs a
/// credential that was not supplied, so chat runs in degraded mode.
pub fn new_client(
    config: &LlmConfig
) -> Result<Option<Arc<dyn ChatClient>>, Box<dyn StdError + Send + Sync>> {
    if config.llm_type.requires_api_key() && config.api_key.is_none() {
        warn!("No API key supplied for {} chat provider; chat is disabled.", config.llm_type);
        return Ok(None);
    }

    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    info!("Chat client configured: Type={}, Model={}", client.name(), client.model());
    Ok(Some(client))
}
