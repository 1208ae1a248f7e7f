// src/services/message_service.rs

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use chatdesk_common::models::{ChatMessage, MessageRole, NewChatMessage};
use chatdesk_common::traits::repository_traits::ChatMessageRepository;
use chatdesk_common::Error;

/// The append-only message log. Broadcasting stays with the callers so
/// this layer is a pure append.
pub struct MessageService {
    message_repo: Arc<dyn ChatMessageRepository>,
}

impl MessageService {
    pub fn new(message_repo: Arc<dyn ChatMessageRepository>) -> Self {
        Self { message_repo }
    }

    /// Append one turn and return the persisted record, with its
    /// server-assigned id and timestamp, for verbatim broadcasting.
    pub async fn add_chat_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<ChatMessage, Error> {
        // Empty content is valid but unusual outside SYSTEM turns.
        if content.is_empty() && role != MessageRole::System {
            debug!(
                "empty {} message appended to session {}",
                role.as_str(),
                session_id
            );
        }
        self.message_repo
            .append(&NewChatMessage {
                session_id,
                role,
                content: content.to_string(),
                metadata,
            })
            .await
    }

    pub async fn session_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, Error> {
        self.message_repo.list_for_session(session_id).await
    }
}
