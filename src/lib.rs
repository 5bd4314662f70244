pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;
pub mod stream;
pub mod ui;

use chat::ChatSession;
use cli::{ Args, Command, ServeArgs };
use client::CompletionEndpoint;
use config::prompt::load_prompts_or_default;
use config::PromptConfig;
use history::initialize_history_store;
use history::view::ConversationsList;
use llm::chat::new_client as new_chat_client;
use llm::LlmConfig;
use log::{ info, warn };
use server::Server;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Completion URL: {}", args.completion_url);
    info!("History Store Type: {}", args.history_type);
    info!("History Store Host: {}", args.history_host);
    info!("Prompts Path: {}", args.prompts_path);
    info!("-------------------------");

    let prompts = load_prompts_or_default(&args.prompts_path)?;

    match args.command.clone().unwrap_or(Command::Chat { conversation: None }) {
        Command::Chat { conversation } => run_chat(&args, prompts, conversation).await,
        Command::History { conversation } => run_history(&args, conversation).await,
        Command::Serve(serve) => run_server(&args, prompts, serve).await,
    }
}

async fn run_chat(
    args: &Args,
    prompts: Arc<PromptConfig>,
    conversation: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = initialize_history_store(args)?;
    let completion = Arc::new(CompletionEndpoint::new(args.completion_url.clone()));
    let mut session = ChatSession::new(store, completion, prompts.welcome_message.clone());

    if let Some(id) = conversation {
        if !session.resume(&id).await {
            warn!("Could not load conversation {}, starting a new one", id);
        }
    }

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    ui::chat::run_chat(&mut session, input, &mut out).await?;
    Ok(())
}

async fn run_history(
    args: &Args,
    conversation: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = initialize_history_store(args)?;
    let mut view = ConversationsList::new(store);
    let mut out = std::io::stdout();
    ui::history::run_history(&mut view, conversation.as_deref(), &mut out).await?;
    Ok(())
}

async fn run_server(
    args: &Args,
    prompts: Arc<PromptConfig>,
    serve: ServeArgs
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_config = LlmConfig {
        llm_type: serve.chat_llm_type.parse()?,
        api_key: Some(serve.chat_api_key.clone()).filter(|k| !k.is_empty()),
        completion_model: serve.chat_model.clone(),
        base_url: serve.chat_base_url.clone(),
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={}",
        chat_config.llm_type,
        chat_client.get_model(),
        chat_client.get_base_url()
    );

    let server = Server::new(
        serve.server_addr,
        chat_client,
        prompts,
        Some(PathBuf::from(&args.prompts_path))
    );
    server.run().await
}
