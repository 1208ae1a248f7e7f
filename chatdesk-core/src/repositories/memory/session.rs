// src/repositories/memory/session.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use chatdesk_common::models::{
    ChatSession, SessionLifecycle, SessionOwnership, TakeoverOutcome,
};
use chatdesk_common::traits::repository_traits::ChatSessionRepository;
use chatdesk_common::Error;

#[derive(Default)]
pub struct MemoryChatSessionRepository {
    sessions: Mutex<HashMap<Uuid, ChatSession>>,
}

impl MemoryChatSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: rewind a session's activity clock so reaper sweeps can
    /// be exercised without waiting.
    pub async fn backdate_activity(&self, session_id: Uuid, to: DateTime<Utc>) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.last_activity_at = to;
        }
    }
}

#[async_trait]
impl ChatSessionRepository for MemoryChatSessionRepository {
    async fn get(&self, session_id: Uuid) -> Result<Option<ChatSession>, Error> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(&session_id).cloned())
    }

    async fn get_by_token(
        &self,
        visitor_id: &str,
        session_token: &str,
    ) -> Result<Option<ChatSession>, Error> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .values()
            .find(|s| s.visitor_id == visitor_id && s.session_token == session_token)
            .cloned())
    }

    async fn create(&self, session: &ChatSession) -> Result<(), Error> {
        let mut sessions = self.sessions.lock().await;
        let duplicate = sessions.values().any(|s| {
            s.visitor_id == session.visitor_id && s.session_token == session.session_token
        });
        if duplicate {
            return Err(Error::Duplicate(format!(
                "session '{}' for visitor '{}'",
                session.session_token, session.visitor_id
            )));
        }
        sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn refresh_activity(
        &self,
        session_id: Uuid,
        current_page: &str,
        locale: &str,
    ) -> Result<ChatSession, Error> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;
        session.current_page = current_page.to_string();
        session.locale = locale.to_string();
        session.last_activity_at = Utc::now();
        // Inbound activity reactivates an ended or abandoned session.
        if session.lifecycle != SessionLifecycle::Active {
            session.lifecycle = SessionLifecycle::Active;
        }
        Ok(session.clone())
    }

    async fn try_takeover(
        &self,
        session_id: Uuid,
        admin_id: &str,
    ) -> Result<TakeoverOutcome, Error> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

        match &session.ownership {
            SessionOwnership::Admin { admin_id: owner } if owner == admin_id => {
                Ok(TakeoverOutcome::Acquired {
                    session: session.clone(),
                    reacquired: true,
                })
            }
            SessionOwnership::Admin { admin_id: owner } => Ok(TakeoverOutcome::Rejected {
                owner: owner.clone(),
            }),
            SessionOwnership::Ai => {
                session.ownership = SessionOwnership::Admin {
                    admin_id: admin_id.to_string(),
                };
                // Admin ownership implies an active lifecycle.
                session.lifecycle = SessionLifecycle::Active;
                session.last_activity_at = Utc::now();
                Ok(TakeoverOutcome::Acquired {
                    session: session.clone(),
                    reacquired: false,
                })
            }
        }
    }

    async fn release(&self, session_id: Uuid) -> Result<Option<ChatSession>, Error> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

        if !session.is_admin_takeover() {
            return Ok(None);
        }
        session.ownership = SessionOwnership::Ai;
        session.lifecycle = SessionLifecycle::Active;
        session.last_activity_at = Utc::now();
        Ok(Some(session.clone()))
    }

    async fn end(&self, session_id: Uuid) -> Result<ChatSession, Error> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;
        session.ownership = SessionOwnership::Ai;
        session.lifecycle = SessionLifecycle::Ended;
        session.last_activity_at = Utc::now();
        Ok(session.clone())
    }

    async fn mark_abandoned_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let mut sessions = self.sessions.lock().await;
        let mut changed = 0u64;
        for session in sessions.values_mut() {
            if session.lifecycle == SessionLifecycle::Active
                && session.ownership == SessionOwnership::Ai
                && session.last_activity_at < cutoff
            {
                session.lifecycle = SessionLifecycle::Abandoned;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
