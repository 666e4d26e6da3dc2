pub mod agent;
pub mod cli;
pub mod error;
pub mod llm;
pub mod models;
pub mod scoring;
pub mod server;

use agent::SalesAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Scoring Base URL: {}", args.scoring_base_url);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("adapter default"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(SalesAgent::initialize(&args).await);
    info!("Scoring backend ready: {}", agent.scorer_ready());
    info!("Chat LLM ready: {}", agent.generator_ready());

    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
