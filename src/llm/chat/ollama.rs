use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use async_trait::async_trait;
use std::error::Error as StdError;
use super::{
    build_http_client,
    ensure_success,
    non_empty_reply,
    ChatClient,
    ChatOptions,
    CompletionResponse,
    ProviderError,
};
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::ChatMessage;
use log::debug;

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OllamaClient {
    pub fn new(
        base_url: Option<String>,
        completion_model: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let model = completion_model.unwrap_or_else(|| "llama3.2".to_string());
        let url = base_url.unwrap_or_else(|| "http://localhost:11434".into());

        Ok(Self {
            http: build_http_client()?,
            base_url: url.trim_end_matches('/').to_string(),
            completion_model: model,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != LlmType::Ollama {
            return Err("Invalid config type for OllamaClient".into());
        }

        Self::new(config.base_url.clone(), config.completion_model.clone())
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions
    ) -> Result<CompletionResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let req = ChatRequest {
            model: &self.completion_model,
            messages: messages
                .iter()
                .map(|m| OllamaMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        debug!("POST {} ({} messages)", url, messages.len());
        let resp = self.http.post(&url).json(&req).send().await?;
        let data = ensure_success(resp).await?
            .json::<ChatResponse>().await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(CompletionResponse {
            response: non_empty_reply(data.message.and_then(|m| m.content))?,
            model: self.completion_model.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.completion_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::test_server::{ direct_http, serve, Stub };
    use crate::models::chat::Role;

    fn client_for(stub: &Stub) -> OllamaClient {
        let mut client = OllamaClient::new(Some(format!("{}/", stub.base_url)), None).unwrap();
        client.http = direct_http();
        client
    }

    fn context() -> Vec<ChatMessage> {
        vec![ChatMessage::new(Role::System, "persona"), ChatMessage::new(Role::User, "salut")]
    }

    #[tokio::test]
    async fn posts_non_streaming_chat_and_reads_message() {
        let stub = serve("/api/chat", 200, r#"{"message":{"role":"assistant","content":"Salut"}}"#).await;

        let reply = client_for(&stub).complete(&context(), &ChatOptions::default()).await.unwrap();
        assert_eq!(reply.response, "Salut");
        assert_eq!(reply.model, "llama3.2");

        let seen = stub.captured();
        assert!(seen.authorization.is_none());
        assert_eq!(seen.body["model"], "llama3.2");
        assert_eq!(seen.body["stream"], false);
        assert_eq!(seen.body["options"]["num_predict"], 300);
        assert_eq!(seen.body["messages"][1]["content"], "salut");
    }

    #[tokio::test]
    async fn server_error_is_retryable_upstream_error() {
        let stub = serve("/api/chat", 500, r#"{"error":"model not loaded"}"#).await;
        let err = client_for(&stub).complete(&context(), &ChatOptions::default()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { status: 500, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn missing_message_is_invalid_response() {
        let stub = serve("/api/chat", 200, "{}").await;
        let err = client_for(&stub).complete(&context(), &ChatOptions::default()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
