pub mod client;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::UserId;
use models::{ChatReply, Conversation};

pub use client::HttpGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a readable response.
    #[error("Network Error: {0}")]
    Transport(String),
    /// The backend answered with `success: false` or without data.
    #[error("Backend Error: {0}")]
    Backend(String),
    /// The id cannot name a single conversation resource.
    #[error("Invalid conversation id: {0:?}")]
    InvalidId(String),
}

impl GatewayError {
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

/// The chat backend as seen by the client. No retries and no caching happen
/// behind this trait; callers decide what a failure means.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Posts a message. Without `conversation_id` the backend opens a new
    /// conversation and reports its id in the reply.
    async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
        user_id: Option<&UserId>,
    ) -> Result<ChatReply, GatewayError>;

    async fn get_conversations(
        &self,
        user_id: Option<&UserId>,
    ) -> Result<Vec<Conversation>, GatewayError>;

    async fn get_conversation(&self, id: &str) -> Result<Conversation, GatewayError>;

    async fn delete_conversation(&self, id: &str) -> Result<(), GatewayError>;

    async fn update_conversation_title(&self, id: &str, title: &str) -> Result<(), GatewayError>;

    /// Deletes every conversation owned by `user_id`.
    async fn clear_conversations(&self, user_id: Option<&UserId>) -> Result<(), GatewayError>;
}
