pub mod api;

use crate::config::PromptConfig;
use crate::llm::chat::ChatClient;
use self::api::{ router, AppState };
use log::info;
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Relay serving `/api/chat` for the chat view.
pub struct Server {
    addr: String,
    state: AppState,
}

impl Server {
    pub fn new(
        addr: String,
        chat_client: Arc<dyn ChatClient>,
        prompts: Arc<PromptConfig>,
        prompts_path: Option<PathBuf>
    ) -> Self {
        Self {
            addr,
            state: AppState::new(chat_client, prompts, prompts_path),
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e|
            format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
        )?;
        info!("Starting HTTP API server on: http://{}", listener.local_addr()?);

        axum::serve(listener, router(self.state.clone()).into_make_service()).await?;
        Ok(())
    }
}
