mod memory;
mod redis;
mod supabase;
pub mod view;

pub use self::memory::MemoryHistoryStore;
pub use self::redis::RedisHistoryStore;
pub use self::supabase::SupabaseHistoryStore;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use thiserror::Error;

use crate::cli::Args;
use crate::models::chat::{ Conversation, ConversationTitle, Message, Role };

const TITLE_MAX_CHARS: usize = 40;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("Failed to encode row: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Duplicate conversation id: {0}")]
    DuplicateConversation(String),
    #[error("Unsupported history store type: {0}")]
    UnsupportedType(String),
}

/// The `conversations` and `messages` tables.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert_conversation(&self, conversation_id: &str) -> Result<(), StoreError>;

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError>;

    async fn insert_message(
        &self,
        conversation_id: &str,
        message: &Message
    ) -> Result<(), StoreError>;

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError>;
}

pub fn create_history_store(args: &Args) -> Result<Arc<dyn HistoryStore>, StoreError> {
    match args.history_type.to_lowercase().as_str() {
        "supabase" => {
            let key = Some(args.history_api_key.clone()).filter(|k| !k.is_empty());
            Ok(Arc::new(SupabaseHistoryStore::new(&args.history_host, key)?))
        }
        "redis" => {
            Ok(Arc::new(RedisHistoryStore::new(&args.history_host, &args.history_redis_prefix)?))
        }
        "memory" => Ok(Arc::new(MemoryHistoryStore::new())),
        _ => Err(StoreError::UnsupportedType(args.history_type.clone())),
    }
}

pub fn initialize_history_store(args: &Args) -> Result<Arc<dyn HistoryStore>, StoreError> {
    info!("Chat history will be stored in: {} at {}", args.history_type, args.history_host);
    create_history_store(args)
}

/// Display title for a conversation: its first user message, whitespace
/// collapsed and cut to 40 characters, or `Conversation {id}`.
pub fn title_for(conversation_id: &str, messages: &[Message]) -> ConversationTitle {
    let first_user = messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|c| !c.is_empty());

    let title = match first_user {
        Some(text) if text.chars().count() > TITLE_MAX_CHARS => {
            let cut: String = text.chars().take(TITLE_MAX_CHARS).collect();
            format!("{}...", cut.trim_end())
        }
        Some(text) => text,
        None => format!("Conversation {}", conversation_id),
    };

    ConversationTitle {
        id: conversation_id.to_string(),
        title,
    }
}
