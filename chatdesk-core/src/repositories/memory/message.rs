// src/repositories/memory/message.rs

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use chatdesk_common::models::{ChatMessage, NewChatMessage};
use chatdesk_common::traits::repository_traits::ChatMessageRepository;
use chatdesk_common::Error;

/// Append-only message store; vector order is insertion order.
#[derive(Default)]
pub struct MemoryChatMessageRepository {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryChatMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatMessageRepository for MemoryChatMessageRepository {
    async fn append(&self, message: &NewChatMessage) -> Result<ChatMessage, Error> {
        let mut messages = self.messages.lock().await;
        let persisted = ChatMessage {
            message_id: Uuid::new_v4(),
            session_id: message.session_id,
            role: message.role,
            content: message.content.clone(),
            metadata: message.metadata.clone(),
            created_at: Utc::now(),
        };
        messages.push(persisted.clone());
        Ok(persisted)
    }

    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, Error> {
        let messages = self.messages.lock().await;
        Ok(messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }
}
