use async_trait::async_trait;
use log::{ debug, info };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ http_stream_generate, ChatClient, ChatCompletion, ParsedLine, ProviderMessage, TextStream };
use crate::llm::{ LlmConfig, LlmError };
use crate::models::chat::OpenAIModel;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const CHAT_COMPLETIONS_ROUTE: &str = "/v1/chat/completions";

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<ProviderMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        let chat_model = model.unwrap_or_else(|| OpenAIModel::default().as_str().to_string());
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let url = if base.ends_with("/chat/completions") {
            base
        } else {
            format!("{}{}", base.trim_end_matches('/'), CHAT_COMPLETIONS_ROUTE)
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                LlmError::Config(format!("Invalid API key format: {}", e))
            )?
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self { http, model: chat_model, url })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::Config("OpenAI API key is required".to_string()))?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

/// Parses one server-sent event line of a chat completion stream.
pub fn parse_sse_line(line: &str) -> ParsedLine {
    let Some(data) = line.strip_prefix("data:") else {
        return ParsedLine::default();
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return ParsedLine { token: None, done: true };
    }

    match serde_json::from_str::<OpenAIStreamResponse>(data) {
        Ok(resp) => {
            let mut parsed = ParsedLine::default();
            for choice in resp.choices {
                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                    parsed.token.get_or_insert_with(String::new).push_str(&content);
                }
                if choice.finish_reason.is_some() {
                    parsed.done = true;
                }
            }
            parsed
        }
        Err(e) => {
            debug!("JSON parse error: {} for data: {}", e, data);
            ParsedLine::default()
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn stream_chat(&self, request: &ChatCompletion) -> Result<TextStream, LlmError> {
        let body = OpenAIChatRequest {
            model: self.model.clone(),
            messages: request.provider_messages(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };
        info!("Streaming {} messages to OpenAI model {}", body.messages.len(), self.model);

        http_stream_generate(self.http.post(&self.url).json(&body), parse_sse_line).await
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_delta_becomes_token() {
        let parsed = parse_sse_line(
            r#"data: {"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#
        );
        assert_eq!(parsed, ParsedLine { token: Some("Hel".to_string()), done: false });
    }

    #[test]
    fn finish_reason_and_done_marker_end_the_stream() {
        let parsed = parse_sse_line(r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#);
        assert!(parsed.done);
        assert!(parsed.token.is_none());
        assert!(parse_sse_line("data: [DONE]").done);
    }

    #[test]
    fn non_data_lines_are_ignored() {
        assert_eq!(parse_sse_line(""), ParsedLine::default());
        assert_eq!(parse_sse_line(": keep-alive"), ParsedLine::default());
        assert_eq!(parse_sse_line("data: not json"), ParsedLine::default());
    }

    #[test]
    fn url_accepts_base_or_full_endpoint() {
        let client = OpenAIChatClient::new("k".into(), None, Some("http://localhost:9/".into())).unwrap();
        assert_eq!(client.get_base_url(), "http://localhost:9/v1/chat/completions");
        assert_eq!(client.get_model(), "gpt-3.5-turbo");

        let client = OpenAIChatClient::new(
            "k".into(),
            Some("gpt-4o".into()),
            Some("http://proxy/v1/chat/completions".into())
        ).unwrap();
        assert_eq!(client.get_base_url(), "http://proxy/v1/chat/completions");
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config = LlmConfig::default();
        assert!(matches!(OpenAIChatClient::from_config(&config), Err(LlmError::Config(_))));
    }
}
