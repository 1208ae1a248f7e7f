// chatdesk-common/src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Whether the conversation is live, explicitly closed, or timed out by
/// the idle reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    Active,
    Ended,
    Abandoned,
}

/// Who answers the visitor: the assistant by default, or a named admin
/// after a takeover.
///
/// `Admin` ownership implies an `Active` lifecycle. The repositories and
/// the takeover coordinator maintain that invariant; `ChatSession::status`
/// relies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOwnership {
    Ai,
    Admin { admin_id: String },
}

/// The externally visible session status, projected from lifecycle and
/// ownership. String forms match the stored column and the dashboard
/// wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    AdminActive,
    Ended,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::AdminActive => "ADMIN_ACTIVE",
            SessionStatus::Ended => "ENDED",
            SessionStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "ACTIVE" => Ok(SessionStatus::Active),
            "ADMIN_ACTIVE" => Ok(SessionStatus::AdminActive),
            "ENDED" => Ok(SessionStatus::Ended),
            "ABANDONED" => Ok(SessionStatus::Abandoned),
            other => Err(Error::Parse(format!("unknown session status '{}'", other))),
        }
    }
}

/// A chat conversation, keyed by (visitor id, client session token).
///
/// The state is stored as the `lifecycle`/`ownership` pair; the
/// status/isAdminTakeover/adminTakeoverBy triple the dashboard sees is
/// derived through the projection methods and cannot drift out of sync.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub session_id: Uuid,
    pub visitor_id: String,
    pub session_token: String,
    pub lifecycle: SessionLifecycle,
    pub ownership: SessionOwnership,
    pub current_page: String,
    pub locale: String,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl ChatSession {
    /// A fresh ACTIVE, assistant-owned session.
    pub fn new(visitor_id: &str, session_token: &str, current_page: &str, locale: &str) -> Self {
        let now = Utc::now();
        ChatSession {
            session_id: Uuid::new_v4(),
            visitor_id: visitor_id.to_string(),
            session_token: session_token.to_string(),
            lifecycle: SessionLifecycle::Active,
            ownership: SessionOwnership::Ai,
            current_page: current_page.to_string(),
            locale: locale.to_string(),
            started_at: now,
            last_activity_at: now,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match (&self.ownership, self.lifecycle) {
            (SessionOwnership::Admin { .. }, _) => SessionStatus::AdminActive,
            (SessionOwnership::Ai, SessionLifecycle::Active) => SessionStatus::Active,
            (SessionOwnership::Ai, SessionLifecycle::Ended) => SessionStatus::Ended,
            (SessionOwnership::Ai, SessionLifecycle::Abandoned) => SessionStatus::Abandoned,
        }
    }

    pub fn is_admin_takeover(&self) -> bool {
        matches!(self.ownership, SessionOwnership::Admin { .. })
    }

    pub fn admin_takeover_by(&self) -> Option<&str> {
        match &self.ownership {
            SessionOwnership::Admin { admin_id } => Some(admin_id),
            SessionOwnership::Ai => None,
        }
    }

    /// Rebuilds the internal pair from stored column values, rejecting
    /// rows where the status text and the admin column disagree.
    pub fn state_from_columns(
        status: &str,
        admin_takeover_by: Option<String>,
    ) -> Result<(SessionLifecycle, SessionOwnership), Error> {
        match (SessionStatus::parse(status)?, admin_takeover_by) {
            (SessionStatus::AdminActive, Some(admin_id)) => {
                Ok((SessionLifecycle::Active, SessionOwnership::Admin { admin_id }))
            }
            (SessionStatus::AdminActive, None) => Err(Error::Parse(
                "ADMIN_ACTIVE session without admin_takeover_by".to_string(),
            )),
            (status, Some(_)) => Err(Error::Parse(format!(
                "{} session with admin_takeover_by set",
                status.as_str()
            ))),
            (SessionStatus::Active, None) => Ok((SessionLifecycle::Active, SessionOwnership::Ai)),
            (SessionStatus::Ended, None) => Ok((SessionLifecycle::Ended, SessionOwnership::Ai)),
            (SessionStatus::Abandoned, None) => {
                Ok((SessionLifecycle::Abandoned, SessionOwnership::Ai))
            }
        }
    }
}

/// Result of the atomic takeover check-and-set at the repository layer.
#[derive(Debug, Clone)]
pub enum TakeoverOutcome {
    /// The admin owns the session. `reacquired` is true when they already
    /// owned it and nothing changed.
    Acquired { session: ChatSession, reacquired: bool },
    /// A different admin owns the session.
    Rejected { owner: String },
}
