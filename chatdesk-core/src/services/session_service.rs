// src/services/session_service.rs

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use chatdesk_common::models::{ChatMessage, ChatSession};
use chatdesk_common::traits::repository_traits::{ChatMessageRepository, ChatSessionRepository};
use chatdesk_common::Error;

/// What the store hands back for one inbound turn: the session row, its
/// transcript in insertion order, and whether this call created it.
pub struct ResolvedSession {
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
    pub created: bool,
}

/// The session store: one session per (visitor, client token) pair.
/// Status transitions belong to the takeover coordinator and the idle
/// reaper; this path only creates, refreshes, and reactivates.
pub struct SessionService {
    session_repo: Arc<dyn ChatSessionRepository>,
    message_repo: Arc<dyn ChatMessageRepository>,
}

impl SessionService {
    pub fn new(
        session_repo: Arc<dyn ChatSessionRepository>,
        message_repo: Arc<dyn ChatMessageRepository>,
    ) -> Self {
        Self {
            session_repo,
            message_repo,
        }
    }

    /// Lookup by the composite key, creating the session lazily on the
    /// first message of a new token. The caller must have run the
    /// visitor registry first; a missing visitor surfaces as a database
    /// error from the foreign key.
    pub async fn get_or_create_session(
        &self,
        visitor_id: &str,
        session_token: &str,
        current_page: &str,
        locale: &str,
    ) -> Result<ResolvedSession, Error> {
        if let Some(existing) = self
            .session_repo
            .get_by_token(visitor_id, session_token)
            .await?
        {
            let session = self
                .session_repo
                .refresh_activity(existing.session_id, current_page, locale)
                .await?;
            let messages = self.message_repo.list_for_session(session.session_id).await?;
            debug!(
                "reusing session {} ({} message(s))",
                session.session_id,
                messages.len()
            );
            return Ok(ResolvedSession {
                session,
                messages,
                created: false,
            });
        }

        let session = ChatSession::new(visitor_id, session_token, current_page, locale);
        match self.session_repo.create(&session).await {
            Ok(()) => {
                info!(
                    "created session {} for visitor '{}'",
                    session.session_id, visitor_id
                );
                Ok(ResolvedSession {
                    session,
                    messages: Vec::new(),
                    created: true,
                })
            }
            // Lost a create race for the same token; the row exists now.
            Err(Error::Duplicate(_)) => {
                let existing = self
                    .session_repo
                    .get_by_token(visitor_id, session_token)
                    .await?
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "session '{}' vanished after duplicate insert",
                            session_token
                        ))
                    })?;
                let session = self
                    .session_repo
                    .refresh_activity(existing.session_id, current_page, locale)
                    .await?;
                let messages =
                    self.message_repo.list_for_session(session.session_id).await?;
                Ok(ResolvedSession {
                    session,
                    messages,
                    created: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Whether a session row already exists for the pair. Feeds the
    /// registry's `new_session` flag.
    pub async fn session_exists(
        &self,
        visitor_id: &str,
        session_token: &str,
    ) -> Result<bool, Error> {
        Ok(self
            .session_repo
            .get_by_token(visitor_id, session_token)
            .await?
            .is_some())
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<ChatSession, Error> {
        self.session_repo
            .get(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
    }
}
