use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant")]
    Model,
}

/// One transcript entry. Identified only by its position in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Empty in list responses that only carry summaries.
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
    #[serde(default)]
    pub conversation: Option<Conversation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UpdateTitleRequest<'a> {
    pub title: &'a str,
}

/// Envelope shared by every backend response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Success with a payload, or a backend-class error.
    pub fn into_data(self) -> Result<T, GatewayError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(GatewayError::Backend("response carried no data".to_string())),
            (false, _) => Err(GatewayError::Backend(
                self.error.filter(|e| !e.is_empty()).unwrap_or(self.message),
            )),
        }
    }

    /// Success flag only; any payload is ignored.
    pub fn into_ack(self) -> Result<(), GatewayError> {
        if self.success {
            Ok(())
        } else {
            Err(GatewayError::Backend(
                self.error.filter(|e| !e.is_empty()).unwrap_or(self.message),
            ))
        }
    }
}
