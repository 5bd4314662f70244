use serde::{ Serialize, Deserialize };
use std::fmt;

pub type ConversationId = String;
pub type ConversationTitleId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Assistant => "assistant",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTitle {
    pub id: ConversationTitleId,
    pub title: String,
}

/// Row shape of the `messages` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRow {
    pub content: String,
    pub role: Role,
    pub conversation_id: ConversationId,
}

impl MessageRow {
    pub fn new(message: &Message, conversation_id: &str) -> Self {
        Self {
            content: message.content.clone(),
            role: message.role,
            conversation_id: conversation_id.to_string(),
        }
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message { role: row.role, content: row.content }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OpenAIModel {
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    DavinciTurbo,
}

impl OpenAIModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenAIModel::DavinciTurbo => "gpt-3.5-turbo",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
        let parsed: Message = serde_json::from_str(r#"{"role":"assistant","content":"yo"}"#).unwrap();
        assert_eq!(parsed, Message::assistant("yo"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"role":"system","content":"x"}"#).is_err());
    }

    #[test]
    fn message_row_ignores_extra_columns() {
        let row: MessageRow = serde_json::from_str(
            r#"{"id":7,"created_at":"2024-01-01","content":"hello","role":"user","conversation_id":"c1"}"#
        ).unwrap();
        assert_eq!(row.conversation_id, "c1");
        assert_eq!(Message::from(row), Message::user("hello"));
    }
}
