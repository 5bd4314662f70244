use log::error;
use std::sync::Arc;

use crate::history::{ title_for, HistoryStore };
use crate::models::chat::{ Conversation, ConversationTitle, Message };

pub const HISTORY_HEADING: &str = "Your chat history:";
pub const EMPTY_SELECTION: &str = "Select a conversation to view messages.";

/// Browses stored conversations and the messages of the selected one.
pub struct ConversationsList {
    store: Arc<dyn HistoryStore>,
    conversations: Vec<Conversation>,
    selected_conversation_id: String,
    messages: Vec<Message>,
}

impl ConversationsList {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            conversations: Vec::new(),
            selected_conversation_id: String::new(),
            messages: Vec::new(),
        }
    }

    /// Fetches conversation ids. On failure the current list is kept.
    pub async fn load(&mut self) {
        match self.store.list_conversations().await {
            Ok(conversations) => self.conversations = conversations,
            Err(e) => error!("Error fetching conversations: {}", e),
        }
    }

    /// Selects a conversation and fetches its messages. An empty id clears
    /// nothing and fetches nothing; on failure the previous messages stay.
    pub async fn select(&mut self, conversation_id: &str) {
        self.selected_conversation_id = conversation_id.to_string();
        if self.selected_conversation_id.is_empty() {
            return;
        }

        match self.store.list_messages(conversation_id).await {
            Ok(messages) => self.messages = messages,
            Err(e) => error!("Error fetching messages: {}", e),
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn selected_conversation_id(&self) -> Option<&str> {
        Some(self.selected_conversation_id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Titles for the sidebar, derived from each conversation's messages.
    /// Conversations whose messages cannot be fetched fall back to their id.
    pub async fn titles(&self) -> Vec<ConversationTitle> {
        let mut titles = Vec::with_capacity(self.conversations.len());
        for conversation in &self.conversations {
            let messages = match self.store.list_messages(&conversation.id).await {
                Ok(messages) => messages,
                Err(e) => {
                    error!("Error fetching messages for {}: {}", conversation.id, e);
                    Vec::new()
                }
            };
            titles.push(title_for(&conversation.id, &messages));
        }
        titles
    }

    pub fn render_sidebar(&self) -> Vec<String> {
        self.conversations
            .iter()
            .map(|c| format!("Conversation {}", c.id))
            .collect()
    }

    pub fn render_main(&self) -> Vec<String> {
        match self.selected_conversation_id() {
            Some(id) if !self.messages.is_empty() => {
                let mut lines = vec![format!("Messages for Conversation {}", id)];
                lines.extend(self.messages.iter().map(|m| m.content.clone()));
                lines
            }
            _ => vec![EMPTY_SELECTION.to_string()],
        }
    }
}
