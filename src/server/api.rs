use crate::config::prompt::{ reload_prompts_if_changed, PromptConfig };
use crate::llm::chat::{ ChatClient, ChatCompletion };
use crate::models::api::ChatRequest;
use crate::models::chat::Message;
use axum::{
    body::Body,
    extract::State,
    http::{ header, StatusCode },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use log::{ error, info, warn };
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task;
use tower_http::cors::{ Any, CorsLayer };

#[derive(Clone)]
pub struct AppState {
    chat_client: Arc<dyn ChatClient>,
    prompts: Arc<RwLock<Arc<PromptConfig>>>,
    prompts_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        prompts: Arc<PromptConfig>,
        prompts_path: Option<PathBuf>
    ) -> Self {
        Self {
            chat_client,
            prompts: Arc::new(RwLock::new(prompts)),
            prompts_path,
        }
    }

    /// Current prompts, reloading the file first if it changed on disk. The
    /// file check runs on the blocking pool.
    async fn current_prompts(&self) -> Arc<PromptConfig> {
        if let Some(path) = &self.prompts_path {
            let current = self.prompts.read().await.clone();
            let (file, snapshot) = (path.clone(), current.clone());
            let checked = task::spawn_blocking(move || reload_prompts_if_changed(&file, &snapshot)).await;
            match checked {
                Ok(Ok(Some(updated))) => {
                    *self.prompts.write().await = updated.clone();
                    return updated;
                }
                Ok(Ok(None)) => {
                    return current;
                }
                Ok(Err(e)) => error!("Failed to reload prompts from {}: {}", path.display(), e),
                Err(e) => error!("Prompt reload task failed: {}", e),
            }
        }
        self.prompts.read().await.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// Keeps messages from the start of the history while their combined length
/// stays within `char_limit` characters.
pub fn trim_to_char_limit(messages: &[Message], char_limit: usize) -> Vec<Message> {
    let mut char_count = 0;
    let mut kept = Vec::new();
    for message in messages {
        let len = message.content.chars().count();
        if char_count + len > char_limit {
            break;
        }
        char_count += len;
        kept.push(message.clone());
    }
    kept
}

async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if req.messages.is_empty() {
        return (StatusCode::BAD_REQUEST, "messages must not be empty").into_response();
    }

    let prompts = state.current_prompts().await;
    let messages = trim_to_char_limit(&req.messages, prompts.char_limit);
    if messages.len() < req.messages.len() {
        warn!(
            "Dropped {} of {} messages over the {} character budget",
            req.messages.len() - messages.len(),
            req.messages.len(),
            prompts.char_limit
        );
    }

    let completion = ChatCompletion {
        system_prompt: prompts.system_prompt.clone(),
        messages,
        max_tokens: prompts.max_tokens,
        temperature: prompts.temperature,
    };

    match state.chat_client.stream_chat(&completion).await {
        Ok(stream) => {
            info!("Streaming completion for {} messages", completion.messages.len());
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                Body::from_stream(stream),
            ).into_response()
        }
        Err(e) => {
            error!("Completion upstream failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}
