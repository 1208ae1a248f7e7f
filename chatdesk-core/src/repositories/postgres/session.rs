// src/repositories/postgres/session.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use chatdesk_common::models::{ChatSession, TakeoverOutcome};
use chatdesk_common::traits::repository_traits::ChatSessionRepository;
use chatdesk_common::Error;

const SESSION_COLUMNS: &str = "session_id, visitor_id, session_token, status, \
     admin_takeover_by, current_page, locale, started_at, last_activity_at";

/// Rebuild a `ChatSession` from its stored columns. Rows violating the
/// status/admin agreement decode to a `Parse` error.
fn session_from_row(row: &PgRow) -> Result<ChatSession, Error> {
    let status: String = row.try_get("status")?;
    let admin_takeover_by: Option<String> = row.try_get("admin_takeover_by")?;
    let (lifecycle, ownership) = ChatSession::state_from_columns(&status, admin_takeover_by)?;
    Ok(ChatSession {
        session_id: row.try_get("session_id")?,
        visitor_id: row.try_get("visitor_id")?,
        session_token: row.try_get("session_token")?,
        lifecycle,
        ownership,
        current_page: row.try_get("current_page")?,
        locale: row.try_get("locale")?,
        started_at: row.try_get::<DateTime<Utc>, _>("started_at")?,
        last_activity_at: row.try_get::<DateTime<Utc>, _>("last_activity_at")?,
    })
}

pub struct PostgresChatSessionRepository {
    pool: Pool<Postgres>,
}

impl PostgresChatSessionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatSessionRepository for PostgresChatSessionRepository {
    async fn get(&self, session_id: Uuid) -> Result<Option<ChatSession>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn get_by_token(
        &self,
        visitor_id: &str,
        session_token: &str,
    ) -> Result<Option<ChatSession>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE visitor_id = $1 AND session_token = $2"
        ))
        .bind(visitor_id)
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn create(&self, session: &ChatSession) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO chat_sessions (
                session_id, visitor_id, session_token, status, admin_takeover_by,
                current_page, locale, started_at, last_activity_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.session_id)
        .bind(&session.visitor_id)
        .bind(&session.session_token)
        .bind(session.status().as_str())
        .bind(session.admin_takeover_by())
        .bind(&session.current_page)
        .bind(&session.locale)
        .bind(session.started_at)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.as_database_error().is_some_and(|db| db.is_unique_violation()) => {
                Err(Error::Duplicate(format!(
                    "session '{}' for visitor '{}'",
                    session.session_token, session.visitor_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn refresh_activity(
        &self,
        session_id: Uuid,
        current_page: &str,
        locale: &str,
    ) -> Result<ChatSession, Error> {
        // A new message on an ended or abandoned session reactivates it.
        let row = sqlx::query(&format!(
            "UPDATE chat_sessions \
             SET current_page = $2, \
                 locale = $3, \
                 last_activity_at = $4, \
                 status = CASE WHEN status IN ('ENDED', 'ABANDONED') \
                               THEN 'ACTIVE' ELSE status END \
             WHERE session_id = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session_id)
        .bind(current_page)
        .bind(locale)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => session_from_row(&r),
            None => Err(Error::NotFound(format!("session {}", session_id))),
        }
    }

    async fn try_takeover(
        &self,
        session_id: Uuid,
        admin_id: &str,
    ) -> Result<TakeoverOutcome, Error> {
        // Row lock so two admins clicking at once see a serialized
        // check-and-set: exactly one winner, one clean rejection.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE session_id = $1 FOR UPDATE"
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(Error::NotFound(format!("session {}", session_id)));
        };
        let session = session_from_row(&row)?;

        if let Some(owner) = session.admin_takeover_by() {
            if owner == admin_id {
                tx.commit().await?;
                return Ok(TakeoverOutcome::Acquired {
                    session,
                    reacquired: true,
                });
            }
            return Ok(TakeoverOutcome::Rejected {
                owner: owner.to_string(),
            });
        }

        // Takeover of an ended session reactivates it: ADMIN_ACTIVE
        // projects to an Active lifecycle.
        let updated = sqlx::query(&format!(
            "UPDATE chat_sessions \
             SET status = 'ADMIN_ACTIVE', admin_takeover_by = $2, last_activity_at = $3 \
             WHERE session_id = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session_id)
        .bind(admin_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        let session = session_from_row(&updated)?;
        tx.commit().await?;

        Ok(TakeoverOutcome::Acquired {
            session,
            reacquired: false,
        })
    }

    async fn release(&self, session_id: Uuid) -> Result<Option<ChatSession>, Error> {
        let row = sqlx::query(&format!(
            "UPDATE chat_sessions \
             SET status = 'ACTIVE', admin_takeover_by = NULL, last_activity_at = $2 \
             WHERE session_id = $1 AND status = 'ADMIN_ACTIVE' \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(session_from_row(&r)?)),
            // Not admin-owned; distinguish "no-op" from "no such session".
            None => match self.get(session_id).await? {
                Some(_) => Ok(None),
                None => Err(Error::NotFound(format!("session {}", session_id))),
            },
        }
    }

    async fn end(&self, session_id: Uuid) -> Result<ChatSession, Error> {
        let row = sqlx::query(&format!(
            "UPDATE chat_sessions \
             SET status = 'ENDED', admin_takeover_by = NULL, last_activity_at = $2 \
             WHERE session_id = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => session_from_row(&r),
            None => Err(Error::NotFound(format!("session {}", session_id))),
        }
    }

    async fn mark_abandoned_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        // Admin-owned sessions are never reaped; the admin is the
        // activity.
        let result = sqlx::query(
            "UPDATE chat_sessions \
             SET status = 'ABANDONED' \
             WHERE status = 'ACTIVE' AND last_activity_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
