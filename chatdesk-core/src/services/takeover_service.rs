// src/services/takeover_service.rs

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use chatdesk_common::models::{ChatMessage, ChatSession, MessageRole, TakeoverOutcome};
use chatdesk_common::traits::repository_traits::ChatSessionRepository;
use chatdesk_common::Error;

use crate::eventbus::{BroadcastHub, ChatEvent};
use crate::services::message_service::MessageService;

/// The takeover coordinator: who answers the visitor, the assistant or
/// one specific admin. All ownership transitions and admin-authored
/// replies go through here; the orchestrator only ever reads the gate.
pub struct TakeoverService {
    session_repo: Arc<dyn ChatSessionRepository>,
    message_service: Arc<MessageService>,
    hub: Arc<BroadcastHub>,
}

impl TakeoverService {
    pub fn new(
        session_repo: Arc<dyn ChatSessionRepository>,
        message_service: Arc<MessageService>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            session_repo,
            message_service,
            hub,
        }
    }

    /// Claim the session for `admin_id`. Exactly one admin wins a race;
    /// the loser gets `AlreadyTakenOver`. Re-taking a session you
    /// already own succeeds without a second SYSTEM message or event.
    pub async fn takeover(&self, session_id: Uuid, admin_id: &str) -> Result<ChatSession, Error> {
        match self.session_repo.try_takeover(session_id, admin_id).await? {
            TakeoverOutcome::Acquired {
                session,
                reacquired: true,
            } => Ok(session),
            TakeoverOutcome::Acquired { session, .. } => {
                info!("admin '{}' took over session {}", admin_id, session_id);
                self.append_system_message(
                    session_id,
                    "admin joined",
                    json!({ "adminId": admin_id }),
                )
                .await;
                self.hub.broadcast(ChatEvent::AdminJoined {
                    session_id,
                    admin_id: admin_id.to_string(),
                });
                Ok(session)
            }
            TakeoverOutcome::Rejected { owner } => {
                Err(Error::AlreadyTakenOver { session_id, owner })
            }
        }
    }

    /// Hand the session back to the assistant. A no-op, not an error,
    /// when nobody had taken it over.
    pub async fn release(&self, session_id: Uuid) -> Result<ChatSession, Error> {
        match self.session_repo.release(session_id).await? {
            Some(session) => {
                info!("session {} released back to the assistant", session_id);
                self.append_system_message(session_id, "admin left", json!({}))
                    .await;
                self.hub.broadcast(ChatEvent::AdminLeft { session_id });
                Ok(session)
            }
            None => {
                self.session_repo
                    .get(session_id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
            }
        }
    }

    /// Terminal transition; clears ownership so the mutual-exclusion
    /// invariant holds on the ended row. Idempotent.
    pub async fn end_session(&self, session_id: Uuid) -> Result<ChatSession, Error> {
        self.session_repo.end(session_id).await
    }

    /// The gate the orchestrator consults before producing an AI reply.
    pub async fn is_admin_takeover(&self, session_id: Uuid) -> Result<bool, Error> {
        let session = self
            .session_repo
            .get(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;
        Ok(session.is_admin_takeover())
    }

    /// Admin replies bypass the orchestrator entirely: append and
    /// broadcast, nothing else.
    pub async fn send_admin_message(
        &self,
        session_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, Error> {
        if self.session_repo.get(session_id).await?.is_none() {
            return Err(Error::NotFound(format!("session {}", session_id)));
        }
        let message = self
            .message_service
            .add_chat_message(session_id, MessageRole::Admin, content, None)
            .await?;
        self.hub.broadcast(ChatEvent::NewMessage {
            session_id,
            message: message.clone(),
            origin_token: None,
        });
        Ok(message)
    }

    /// SYSTEM markers are best effort; a failed append must not fail
    /// the transition that already happened.
    async fn append_system_message(
        &self,
        session_id: Uuid,
        content: &str,
        metadata: serde_json::Value,
    ) {
        if let Err(e) = self
            .message_service
            .add_chat_message(session_id, MessageRole::System, content, Some(metadata))
            .await
        {
            warn!(
                "failed to append '{}' marker to session {}: {:?}",
                content, session_id, e
            );
        }
    }
}
