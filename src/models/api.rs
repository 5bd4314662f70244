use serde::{ Serialize, Deserialize };
use crate::models::chat::Message;

/// Body posted to the completion endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}
