pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use futures::{ Stream, StreamExt };
use log::{ debug, error };
use serde::{ Deserialize, Serialize };
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ LlmConfig, LlmError, LlmType };
use self::ollama::OllamaChatClient;
use self::openai::OpenAIChatClient;
use crate::models::chat::Message;
use crate::stream::LineBuffer;

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Message shape shared by the upstream chat APIs, which also accept a
/// `system` role.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatCompletion {
    pub fn provider_messages(&self) -> Vec<ProviderMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if !self.system_prompt.is_empty() {
            out.push(ProviderMessage {
                role: "system".to_string(),
                content: self.system_prompt.clone(),
            });
        }
        out.extend(
            self.messages.iter().map(|m| ProviderMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
        );
        out
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Starts a streamed completion. Connection and status failures are
    /// returned here; failures after the body starts arrive as stream items.
    async fn stream_chat(&self, request: &ChatCompletion) -> Result<TextStream, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Ollama => Arc::new(OllamaChatClient::from_config(config)?),
        LlmType::OpenAI => Arc::new(OpenAIChatClient::from_config(config)?),
    };
    Ok(client)
}

/// What a provider found in one line of its streamed body.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedLine {
    pub token: Option<String>,
    pub done: bool,
}

/// Sends `request`, checks the status, then forwards tokens parsed from each
/// body line through a channel-backed stream until the parser reports done
/// or the body ends.
pub async fn http_stream_generate(
    request: reqwest::RequestBuilder,
    line_parser: fn(&str) -> ParsedLine
) -> Result<TextStream, LlmError> {
    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!("Upstream completion failed with {}: {}", status, body);
        return Err(LlmError::Status { status, body });
    }

    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut bytes = resp.bytes_stream();
        let mut lines = LineBuffer::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(buf) => {
                    for line in lines.push(&buf) {
                        if forward_line(&tx, &line, line_parser).await {
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(LlmError::Http(e))).await;
                    return;
                }
            }
        }

        if let Some(line) = lines.finish() {
            forward_line(&tx, &line, line_parser).await;
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}

/// Returns true when streaming should stop.
async fn forward_line(
    tx: &mpsc::Sender<Result<String, LlmError>>,
    line: &str,
    line_parser: fn(&str) -> ParsedLine
) -> bool {
    let parsed = line_parser(line);
    if let Some(token) = parsed.token {
        if tx.send(Ok(token)).await.is_err() {
            debug!("Stream receiver dropped, stopping upstream read");
            return true;
        }
    }
    parsed.done
}
