use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::message::{ChatMessage, NewChatMessage};
use crate::models::session::{ChatSession, TakeoverOutcome};
use crate::models::visitor::{
    ContactCapture, NewPageView, PageView, Visitor, VisitorContact, VisitorProfile,
};

#[async_trait]
pub trait VisitorRepository: Send + Sync {
    async fn get(&self, visitor_id: &str) -> Result<Option<Visitor>, Error>;

    /// Creates the visitor on first sight or refreshes the existing row.
    /// `new_session` controls whether `total_visits` is incremented; the
    /// upsert itself is idempotent either way.
    async fn upsert(&self, profile: &VisitorProfile, new_session: bool) -> Result<Visitor, Error>;

    /// Inserts or replaces the visitor's single contact record.
    async fn set_contact(&self, capture: &ContactCapture) -> Result<VisitorContact, Error>;

    async fn get_contact(&self, visitor_id: &str) -> Result<Option<VisitorContact>, Error>;

    async fn record_page_view(&self, view: &NewPageView) -> Result<PageView, Error>;
}

#[async_trait]
pub trait ChatSessionRepository: Send + Sync {
    async fn get(&self, session_id: Uuid) -> Result<Option<ChatSession>, Error>;

    async fn get_by_token(
        &self,
        visitor_id: &str,
        session_token: &str,
    ) -> Result<Option<ChatSession>, Error>;

    /// Fails with `Error::Duplicate` when a session for the same
    /// (visitor, token) pair already exists.
    async fn create(&self, session: &ChatSession) -> Result<(), Error>;

    /// Bumps `last_activity_at`, updates page and locale, and brings an
    /// ended or abandoned session back to ACTIVE. Called on every inbound
    /// visitor turn.
    async fn refresh_activity(
        &self,
        session_id: Uuid,
        current_page: &str,
        locale: &str,
    ) -> Result<ChatSession, Error>;

    /// Atomic takeover check-and-set; never overwrites another admin.
    async fn try_takeover(
        &self,
        session_id: Uuid,
        admin_id: &str,
    ) -> Result<TakeoverOutcome, Error>;

    /// Hands the session back to the assistant. Returns the updated row,
    /// or `None` when the session was not admin-owned.
    async fn release(&self, session_id: Uuid) -> Result<Option<ChatSession>, Error>;

    async fn end(&self, session_id: Uuid) -> Result<ChatSession, Error>;

    /// Marks AI-owned ACTIVE sessions idle since `cutoff` as ABANDONED.
    /// Returns how many rows changed.
    async fn mark_abandoned_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;
}

#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// Appends one message and returns the persisted record with its
    /// server-assigned id and timestamp.
    async fn append(&self, message: &NewChatMessage) -> Result<ChatMessage, Error>;

    /// The session transcript in insertion order.
    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, Error>;
}
