//! Conversation state behind the chat view.

use log::{ error, info };
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::client::{ ClientError, CompletionSource };
use crate::history::HistoryStore;
use crate::models::chat::{ ConversationId, Message };
use crate::stream::accumulate;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("No conversation ID available.")]
    NoConversation,
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Progress reported while a message is being answered.
#[derive(Debug, PartialEq)]
pub enum ChatEvent<'a> {
    Loading(bool),
    Delta(&'a str),
}

pub fn generate_conversation_id() -> ConversationId {
    Uuid::new_v4().to_string()
}

pub struct ChatSession {
    store: Arc<dyn HistoryStore>,
    completion: Arc<dyn CompletionSource>,
    welcome_message: String,
    messages: Vec<Message>,
    loading: bool,
    conversation_id: Option<ConversationId>,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        completion: Arc<dyn CompletionSource>,
        welcome_message: impl Into<String>
    ) -> Self {
        let welcome_message = welcome_message.into();
        Self {
            store,
            completion,
            messages: vec![Message::assistant(welcome_message.clone())],
            welcome_message,
            loading: false,
            conversation_id: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Back to the welcome message. The next send opens a new conversation.
    pub fn reset(&mut self) {
        self.messages = vec![Message::assistant(self.welcome_message.clone())];
        self.conversation_id = None;
        self.loading = false;
    }

    /// Continues a stored conversation. If its messages cannot be fetched the
    /// session is left as it was.
    pub async fn resume(&mut self, conversation_id: &str) -> bool {
        match self.store.list_messages(conversation_id).await {
            Ok(stored) => {
                let mut messages = vec![Message::assistant(self.welcome_message.clone())];
                messages.extend(stored);
                self.messages = messages;
                self.conversation_id = Some(conversation_id.to_string());
                info!("Resumed conversation {}", conversation_id);
                true
            }
            Err(e) => {
                error!("Error fetching messages for {}: {}", conversation_id, e);
                false
            }
        }
    }

    /// Returns the current conversation id, creating and storing a new one on
    /// first use. `None` if the store rejected the insert.
    pub async fn ensure_conversation(&mut self) -> Option<ConversationId> {
        if let Some(id) = &self.conversation_id {
            return Some(id.clone());
        }

        let new_id = generate_conversation_id();
        if let Err(e) = self.store.insert_conversation(&new_id).await {
            error!("Error inserting new conversation: {}", e);
            return None;
        }

        info!("Started conversation {}", new_id);
        self.conversation_id = Some(new_id.clone());
        Some(new_id)
    }

    async fn save_message(&self, message: &Message, conversation_id: &str) {
        if let Err(e) = self.store.insert_message(conversation_id, message).await {
            error!("Error saving message to database: {}", e);
        }
    }

    fn set_loading<F: FnMut(ChatEvent<'_>)>(&mut self, loading: bool, on_event: &mut F) {
        if self.loading != loading {
            self.loading = loading;
            on_event(ChatEvent::Loading(loading));
        }
    }

    /// Appends `message`, posts the whole history to the completion endpoint
    /// and appends the streamed reply once the body ends. Storage failures
    /// are logged and do not stop the exchange.
    pub async fn send<F>(&mut self, message: Message, mut on_event: F) -> Result<Message, ChatError>
        where F: FnMut(ChatEvent<'_>)
    {
        let Some(convo_id) = self.ensure_conversation().await else {
            self.set_loading(false, &mut on_event);
            error!("No conversation ID available.");
            return Err(ChatError::NoConversation);
        };

        self.messages.push(message.clone());
        self.save_message(&message, &convo_id).await;

        self.set_loading(true, &mut on_event);
        let stream = match self.completion.open(&self.messages).await {
            Ok(stream) => stream,
            Err(e) => {
                self.set_loading(false, &mut on_event);
                error!("Completion request failed: {}", e);
                return Err(e.into());
            }
        };
        self.set_loading(false, &mut on_event);

        let content = accumulate(stream, |delta| on_event(ChatEvent::Delta(delta))).await.map_err(
            |e| {
                error!("Completion stream ended with error: {}", e);
                ChatError::from(e)
            }
        )?;

        let assistant_message = Message::assistant(content);
        self.messages.push(assistant_message.clone());
        self.save_message(&assistant_message, &convo_id).await;

        Ok(assistant_message)
    }
}
