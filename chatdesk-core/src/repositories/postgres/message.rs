// src/repositories/postgres/message.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use chatdesk_common::models::{ChatMessage, MessageRole, NewChatMessage};
use chatdesk_common::traits::repository_traits::ChatMessageRepository;
use chatdesk_common::Error;

fn message_from_row(row: &PgRow) -> Result<ChatMessage, Error> {
    let role: String = row.try_get("role")?;
    Ok(ChatMessage {
        message_id: row.try_get("message_id")?,
        session_id: row.try_get("session_id")?,
        role: MessageRole::parse(&role)?,
        content: row.try_get("content")?,
        metadata: row.try_get::<Option<serde_json::Value>, _>("metadata")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

pub struct PostgresChatMessageRepository {
    pool: Pool<Postgres>,
}

impl PostgresChatMessageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatMessageRepository for PostgresChatMessageRepository {
    async fn append(&self, message: &NewChatMessage) -> Result<ChatMessage, Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO chat_messages (
                message_id, session_id, role, content, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING message_id, session_id, role, content, metadata, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.session_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&message.metadata)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        message_from_row(&row)
    }

    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, Error> {
        // message_seq keeps replay order stable even when two appends
        // share a timestamp.
        let rows = sqlx::query(
            r#"
            SELECT message_id, session_id, role, content, metadata, created_at
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY message_seq ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(message_from_row).collect()
    }
}
