use clap::Parser;
use std::time::Duration;

use crate::agent::GatewaySettings;
use crate::llm::chat::ChatOptions;
use crate::llm::{ LlmConfig, LlmType };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Directory served under /assets and scanned for photo categories.
    #[arg(long, env = "ASSETS_DIR", default_value = "assets")]
    pub assets_dir: String,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider. Without it keyed providers run in degraded mode.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub chat_api_key: Option<String>,

    /// Model name for chat completion (e.g., gpt-4o-mini, llama3.2)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Sampling temperature sent to the provider.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.3")]
    pub chat_temperature: f32,

    /// Upper bound on generated tokens per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "300")]
    pub chat_max_tokens: u32,

    /// Seconds to wait for one provider call before giving up on that attempt.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value = "30")]
    pub chat_timeout_secs: u64,

    /// Refuse to start when the provider credential is missing instead of degrading.
    #[arg(long, env = "REQUIRE_API_KEY", default_value = "false")]
    pub require_api_key: bool,

    // --- Persona / History Args ---
    /// Optional file replacing the built-in persona prompt.
    #[arg(long, env = "PERSONA_PATH")]
    pub persona_path: Option<String>,

    /// Send the accumulated session history to the provider, not just persona + message.
    #[arg(long, env = "HISTORY_CONTEXT", default_value = "false")]
    pub history_context: bool,

    /// Session logs kept in memory; the least recently used one is dropped beyond this.
    #[arg(long, env = "MAX_SESSIONS", default_value = "1000")]
    pub max_sessions: usize,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    pub fn chat_llm_config(&self) -> Result<LlmConfig, String> {
        let llm_type: LlmType = self.chat_llm_type
            .parse()
            .map_err(|e| format!("Invalid chat LLM type: {}", e))?;

        Ok(LlmConfig {
            llm_type,
            api_key: self.chat_api_key.clone().filter(|k| !k.trim().is_empty()),
            completion_model: self.chat_model.clone(),
            base_url: self.chat_base_url.clone(),
        })
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            options: ChatOptions {
                temperature: self.chat_temperature,
                max_tokens: self.chat_max_tokens,
            },
            timeout: Duration::from_secs(self.chat_timeout_secs),
            history_context: self.history_context,
        }
    }
}
