use async_trait::async_trait;
use log::{ debug, info };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ http_stream_generate, ChatClient, ChatCompletion, ParsedLine, ProviderMessage, TextStream };
use crate::llm::{ LlmConfig, LlmError, LlmType };

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3";

#[derive(Debug)]
pub struct OllamaChatClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ProviderMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct StreamResponse {
    message: Option<ProviderMessage>,
    #[serde(default)]
    done: bool,
}

impl OllamaChatClient {
    pub fn new(base_url: Option<String>, completion_model: Option<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            completion_model: completion_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.llm_type != LlmType::Ollama {
            return Err(LlmError::Config("Invalid config type for OllamaChatClient".into()));
        }

        Ok(Self::new(config.base_url.clone(), config.completion_model.clone()))
    }
}

/// Parses one NDJSON line of an Ollama chat stream.
pub fn parse_ndjson_line(line: &str) -> ParsedLine {
    if line.trim().is_empty() {
        return ParsedLine::default();
    }
    match serde_json::from_str::<StreamResponse>(line) {
        Ok(resp) =>
            ParsedLine {
                token: resp.message.map(|m| m.content).filter(|c| !c.is_empty()),
                done: resp.done,
            },
        Err(e) => {
            debug!("Ollama JSON parse error: {} for line: {}", e, line);
            ParsedLine::default()
        }
    }
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn stream_chat(&self, request: &ChatCompletion) -> Result<TextStream, LlmError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: self.completion_model.clone(),
            messages: request.provider_messages(),
            stream: true,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };
        info!("Streaming {} messages to Ollama model {}", body.messages.len(), self.completion_model);

        http_stream_generate(self.http.post(&url).json(&body), parse_ndjson_line).await
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}
