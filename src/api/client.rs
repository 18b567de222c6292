use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::models::{
    ApiResponse, ChatReply, Conversation, SendMessageRequest, UpdateTitleRequest,
};
use crate::api::{ChatGateway, GatewayError};
use crate::config::ApiConfig;
use crate::identity::UserId;

pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn conversations_url(&self) -> String {
        format!("{}/chat/conversations", self.base_url)
    }

    /// `id` always lands in a single percent-encoded path segment.
    fn conversation_url(&self, id: &str) -> Result<Url, GatewayError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(GatewayError::InvalidId(id.to_string()));
        }

        let mut url = Url::parse(&self.conversations_url())
            .map_err(|e| GatewayError::Transport(format!("invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport("base url cannot carry a path".to_string()))?
            .push(id);
        Ok(url)
    }

    /// The envelope decides success; HTTP status is only logged.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>, GatewayError> {
        let status = response.status();
        debug!("{} {}", status, response.url());

        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| GatewayError::Transport(format!("unreadable response ({}): {}", status, e)))
    }
}

fn user_query(user_id: Option<&UserId>) -> Vec<(&'static str, &str)> {
    user_id
        .map(|id| vec![("userId", id.as_str())])
        .unwrap_or_default()
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
        user_id: Option<&UserId>,
    ) -> Result<ChatReply, GatewayError> {
        let body = SendMessageRequest {
            message: content,
            conversation_id,
            user_id: user_id.map(UserId::as_str),
        };

        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode::<ChatReply>(response).await?.into_data()
    }

    async fn get_conversations(
        &self,
        user_id: Option<&UserId>,
    ) -> Result<Vec<Conversation>, GatewayError> {
        let response = self
            .client
            .get(self.conversations_url())
            .query(&user_query(user_id))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode::<Vec<Conversation>>(response).await?.into_data()
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, GatewayError> {
        let response = self
            .client
            .get(self.conversation_url(id)?)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode::<Conversation>(response).await?.into_data()
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.conversation_url(id)?)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode::<serde_json::Value>(response).await?.into_ack()
    }

    async fn update_conversation_title(&self, id: &str, title: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .patch(self.conversation_url(id)?)
            .json(&UpdateTitleRequest { title })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode::<serde_json::Value>(response).await?.into_ack()
    }

    async fn clear_conversations(&self, user_id: Option<&UserId>) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.conversations_url())
            .query(&user_query(user_id))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode::<serde_json::Value>(response).await?.into_ack()
    }
}
