use crate::history::HistoryStore;
use crate::llm::chat::{ ChatClient, ChatOptions, CompletionResponse, ProviderError };
use crate::models::chat::{ ChatMessage, Role };

use log::{ info, warn, error, debug };
use std::sync::Arc;
use std::time::{ Duration, Instant };
use thiserror::Error;
use tokio::time::timeout;

/// One initial attempt plus a single retry for transient provider failures.
const MAX_ATTEMPTS: usize = 2;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no chat provider is configured")]
    NotConfigured,
    #[error("history store failure: {0}")]
    History(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub options: ChatOptions,
    pub timeout: Duration,
    pub history_context: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            options: ChatOptions::default(),
            timeout: Duration::from_secs(30),
            history_context: false,
        }
    }
}

pub struct ChatGateway {
    chat_client: Option<Arc<dyn ChatClient>>,
    history_store: Arc<dyn HistoryStore>,
    persona: Arc<str>,
    settings: GatewaySettings,
}

impl ChatGateway {
    pub fn new(
        chat_client: Option<Arc<dyn ChatClient>>,
        history_store: Arc<dyn HistoryStore>,
        persona: Arc<str>,
        settings: GatewaySettings
    ) -> Self {
        Self { chat_client, history_store, persona, settings }
    }

    pub fn is_enabled(&self) -> bool {
        self.chat_client.is_some()
    }

    pub fn history_store(&self) -> &Arc<dyn HistoryStore> {
        &self.history_store
    }

    /// Answers `message` in `session_id`, then records the turn in that
    /// session's history.
    pub async fn reply(&self, session_id: &str, message: &str) -> Result<String, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let client = self.chat_client.as_ref().ok_or(ChatError::NotConfigured)?;

        self.history_store
            .seed(session_id, &self.persona).await
            .map_err(|e| ChatError::History(e.to_string()))?;

        let context = self.build_context(session_id, message).await?;
        debug!("Session {}: sending {} messages to {}", session_id, context.len(), client.name());

        let started = Instant::now();
        let completion = self.complete_with_retry(client.as_ref(), &context).await?;
        info!(
            "Session {}: {} replied in {} ms ({} chars)",
            session_id,
            completion.model,
            started.elapsed().as_millis(),
            completion.response.len()
        );

        // A reply already produced is returned even if it could not be recorded.
        for (role, content) in [(Role::User, message), (Role::Assistant, completion.response.as_str())] {
            if let Err(e) = self.history_store.add_message(session_id, role, content).await {
                warn!("Session {}: failed to record {} message: {}", session_id, role, e);
            }
        }

        Ok(completion.response)
    }

    async fn build_context(
        &self,
        session_id: &str,
        message: &str
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let mut context = if self.settings.history_context {
            self.history_store
                .get_conversation(session_id).await
                .map_err(|e| ChatError::History(e.to_string()))?.messages
        } else {
            vec![ChatMessage::new(Role::System, &*self.persona)]
        };
        context.push(ChatMessage::new(Role::User, message));
        Ok(context)
    }

    async fn complete_with_retry(
        &self,
        client: &dyn ChatClient,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, ProviderError> {
        let mut attempt = 1;
        loop {
            let result = match
                timeout(self.settings.timeout, client.complete(messages, &self.settings.options)).await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.settings.timeout)),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!("{} attempt {} failed, retrying: {}", client.name(), attempt, e);
                    attempt += 1;
                }
                Err(e) => {
                    error!("{} call failed after {} attempt(s): {}", client.name(), attempt, e);
                    return Err(e);
                }
                Ok(completion) => {
                    return Ok(completion);
                }
            }
        }
    }
}
