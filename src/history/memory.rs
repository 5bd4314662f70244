use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::history::{ HistoryStore, StoreError };
use crate::models::chat::{ Conversation, Message };

#[derive(Default)]
struct Tables {
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<Message>>,
}

/// Process-local store; contents are lost on exit.
#[derive(Default)]
pub struct MemoryHistoryStore {
    tables: RwLock<Tables>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn insert_conversation(&self, conversation_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.conversations.iter().any(|c| c.id == conversation_id) {
            return Err(StoreError::DuplicateConversation(conversation_id.to_string()));
        }
        tables.conversations.push(Conversation { id: conversation_id.to_string() });
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        Ok(self.tables.read().await.conversations.clone())
    }

    async fn insert_message(
        &self,
        conversation_id: &str,
        message: &Message
    ) -> Result<(), StoreError> {
        self.tables
            .write().await
            .messages.entry(conversation_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError> {
        Ok(self.tables.read().await.messages.get(conversation_id).cloned().unwrap_or_default())
    }
}
