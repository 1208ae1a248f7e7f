// chatdesk-common/src/models/message.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    User,
    Assistant,
    Admin,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "USER",
            MessageRole::Assistant => "ASSISTANT",
            MessageRole::Admin => "ADMIN",
            MessageRole::System => "SYSTEM",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "USER" => Ok(MessageRole::User),
            "ASSISTANT" => Ok(MessageRole::Assistant),
            "ADMIN" => Ok(MessageRole::Admin),
            "SYSTEM" => Ok(MessageRole::System),
            other => Err(Error::Parse(format!("unknown message role '{}'", other))),
        }
    }
}

/// One turn in a session's append-only transcript.
///
/// `metadata` carries structured extras, most notably the function calls
/// that accompanied an assistant turn.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Payload for appending to the log; id and timestamp are assigned by the
/// repository so clocks are consistent.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}
