pub mod agent;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod photos;

use agent::ChatGateway;
use cli::Args;
use config::prompt::load_persona;
use history::initialize_history_store;
use llm::chat::new_client as new_chat_client;
use log::{ info, warn, error };
use photos::PhotoLister;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Assets Directory: {}", args.assets_dir);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("adapter default"));
    info!("Chat Timeout: {}s", args.chat_timeout_secs);
    info!("History Context: {}", args.history_context);
    info!("Max Sessions: {}", args.max_sessions);
    info!("Persona: {}", args.persona_path.as_deref().unwrap_or("built-in"));
    info!("-------------------------");

    let persona = load_persona(args.persona_path.as_deref())?;
    let chat_client = new_chat_client(&args.chat_llm_config()?)?;
    if chat_client.is_none() {
        if args.require_api_key {
            error!("Chat provider credential is missing and --require-api-key is set.");
            return Err("missing chat provider API key".into());
        }
        warn!("Chat runs in degraded mode: every message gets the fallback reply.");
    }

    let gateway = ChatGateway::new(
        chat_client,
        initialize_history_store(args.max_sessions),
        persona,
        args.gateway_settings()
    );
    let photos = PhotoLister::new(&args.assets_dir);

    Server::new(args.server_addr.clone(), gateway, photos).run().await
}
