use async_trait::async_trait;
use log::{ debug, error };
use reqwest::{ Client as HttpClient, RequestBuilder };
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::history::{ HistoryStore, StoreError };
use crate::models::chat::{ Conversation, Message, MessageRow };

const REST_PATH: &str = "rest/v1/";

#[derive(Serialize)]
struct ConversationRow<'a> {
    id: &'a str,
}

/// Talks to the hosted database through its PostgREST interface.
pub struct SupabaseHistoryStore {
    http: HttpClient,
    rest_url: Url,
    api_key: Option<String>,
}

impl SupabaseHistoryStore {
    pub fn new(project_url: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let mut base = Url::parse(project_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: HttpClient::new(),
            rest_url: base.join(REST_PATH)?,
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        Ok(self.rest_url.join(table)?)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("apikey", key).bearer_auth(key),
            None => req,
        }
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, rows: &[T]) -> Result<(), StoreError> {
        let url = self.table_url(table)?;
        let resp = self
            .authorize(self.http.post(url))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)]
    ) -> Result<Vec<T>, StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().extend_pairs(query);
        debug!("Selecting from {}", url);
        let resp = self.authorize(self.http.get(url)).send().await?;
        Ok(check_status(resp).await?.json::<Vec<T>>().await?)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    error!("Store request failed with {}: {}", status, body);
    Err(StoreError::Status { status, body })
}

#[async_trait]
impl HistoryStore for SupabaseHistoryStore {
    async fn insert_conversation(&self, conversation_id: &str) -> Result<(), StoreError> {
        self.insert("conversations", &[ConversationRow { id: conversation_id }]).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        self.select("conversations", &[("select", "id")]).await
    }

    async fn insert_message(
        &self,
        conversation_id: &str,
        message: &Message
    ) -> Result<(), StoreError> {
        self.insert("messages", &[MessageRow::new(message, conversation_id)]).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError> {
        let filter = format!("eq.{}", conversation_id);
        let rows: Vec<MessageRow> = self.select(
            "messages",
            &[("select", "*"), ("conversation_id", filter.as_str())]
        ).await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }
}
