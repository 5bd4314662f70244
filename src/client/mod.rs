//! Client side of the completion endpoint: posts the message history and
//! hands back the raw chunked body.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{ Stream, StreamExt };
use log::{ error, info };
use reqwest::{ Client as HttpClient, StatusCode };
use std::pin::Pin;
use thiserror::Error;

use crate::models::api::ChatRequest;
use crate::models::chat::Message;

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success status; displays as the status text.
    #[error("{status_text}")]
    Status {
        status: StatusCode,
        status_text: String,
    },
}

#[async_trait]
pub trait CompletionSource: Send + Sync {
    async fn open(&self, messages: &[Message]) -> Result<ChunkStream, ClientError>;
}

#[derive(Debug, Clone)]
pub struct CompletionEndpoint {
    http: HttpClient,
    url: String,
}

impl CompletionEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Reason phrase for `status`, or its code when the status is not a
/// registered one.
fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

#[async_trait]
impl CompletionSource for CompletionEndpoint {
    async fn open(&self, messages: &[Message]) -> Result<ChunkStream, ClientError> {
        let body = ChatRequest { messages: messages.to_vec() };
        info!("Posting {} messages to {}", body.messages.len(), self.url);

        let resp = self.http.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let status_text = status_text(status);
            error!("Completion endpoint returned {}", status);
            return Err(ClientError::Status { status, status_text });
        }

        Ok(Box::pin(resp.bytes_stream().map(|chunk| chunk.map_err(ClientError::from))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::accumulate;
    use axum::{ http::StatusCode as AxumStatus, routing::post, Json, Router };
    use std::net::SocketAddr;

    async fn spawn(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn posts_history_and_reads_body() {
        async fn echo(Json(req): Json<ChatRequest>) -> String {
            format!("{} messages, last: {}", req.messages.len(), req.messages[1].content)
        }
        let addr = spawn(Router::new().route("/api/chat", post(echo))).await;
        let endpoint = CompletionEndpoint::new(format!("http://{}/api/chat", addr));

        let stream = endpoint
            .open(&[Message::assistant("welcome"), Message::user("ping")]).await
            .unwrap();
        let text = accumulate(stream, |_| {}).await.unwrap();
        assert_eq!(text, "2 messages, last: ping");
    }

    #[tokio::test]
    async fn non_success_status_carries_status_text() {
        async fn unavailable() -> AxumStatus {
            AxumStatus::SERVICE_UNAVAILABLE
        }
        let addr = spawn(Router::new().route("/api/chat", post(unavailable))).await;
        let endpoint = CompletionEndpoint::new(format!("http://{}/api/chat", addr));

        let err = match endpoint.open(&[Message::user("ping")]).await {
            Err(e) => e,
            Ok(_) => panic!("expected a status error"),
        };
        assert_eq!(err.to_string(), "Service Unavailable");
        assert!(matches!(err, ClientError::Status { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn unregistered_status_falls_back_to_code() {
        async fn odd() -> AxumStatus {
            AxumStatus::from_u16(599).unwrap()
        }
        let addr = spawn(Router::new().route("/api/chat", post(odd))).await;
        let endpoint = CompletionEndpoint::new(format!("http://{}/api/chat", addr));

        let err = match endpoint.open(&[Message::user("ping")]).await {
            Err(e) => e,
            Ok(_) => panic!("expected a status error"),
        };
        assert_eq!(err.to_string(), "599");
    }
}
