use async_trait::async_trait;
use log::error;
use redis::{ AsyncCommands, Client, Script };

use crate::history::{ HistoryStore, StoreError };
use crate::models::chat::{ Conversation, Message, MessageRow };

/// Adds the id to the uniqueness set and appends it to the list in one step.
/// Returns 0 when the id was already present.
const INSERT_CONVERSATION: &str =
    r#"
if redis.call('SADD', KEYS[1], ARGV[1]) == 0 then
    return 0
end
redis.call('RPUSH', KEYS[2], ARGV[1])
return 1
"#;

/// Conversations live in a list at `{prefix}conversations` guarded by a set
/// for id uniqueness; each conversation's rows are JSON entries in a list at
/// `{prefix}messages:{id}`.
pub struct RedisHistoryStore {
    client: Client,
    key_prefix: String,
    insert_conversation: Script,
}

impl RedisHistoryStore {
    pub fn new(host: &str, key_prefix: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(host)?,
            key_prefix: key_prefix.to_string(),
            insert_conversation: Script::new(INSERT_CONVERSATION),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn conversations_key(&self) -> String {
        format!("{}conversations", self.key_prefix)
    }

    fn conversation_ids_key(&self) -> String {
        format!("{}conversation_ids", self.key_prefix)
    }

    fn messages_key(&self, conversation_id: &str) -> String {
        format!("{}messages:{}", self.key_prefix, conversation_id)
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn insert_conversation(&self, conversation_id: &str) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let added: i64 = self.insert_conversation
            .key(self.conversation_ids_key())
            .key(self.conversations_key())
            .arg(conversation_id)
            .invoke_async(&mut conn).await?;
        if added == 0 {
            return Err(StoreError::DuplicateConversation(conversation_id.to_string()));
        }
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let mut conn = self.get_connection().await?;
        let ids: Vec<String> = conn.lrange(self.conversations_key(), 0, -1).await?;
        Ok(
            ids
                .into_iter()
                .map(|id| Conversation { id })
                .collect()
        )
    }

    async fn insert_message(
        &self,
        conversation_id: &str,
        message: &Message
    ) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let row = serde_json::to_string(&MessageRow::new(message, conversation_id))?;
        let _: i64 = conn.rpush(self.messages_key(conversation_id), &row).await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError> {
        let mut conn = self.get_connection().await?;
        let json_entries: Vec<String> = conn.lrange(self.messages_key(conversation_id), 0, -1).await?;
        let mut messages = Vec::with_capacity(json_entries.len());

        for json_entry in &json_entries {
            match serde_json::from_str::<MessageRow>(json_entry) {
                Ok(row) => messages.push(row.into()),
                Err(e) => {
                    error!("Error parsing history entry: {}", e);
                }
            }
        }

        Ok(messages)
    }
}
