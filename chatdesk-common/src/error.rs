// chatdesk-common/src/error.rs

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The losing side of a takeover race, or an attempt to claim a
    /// session another admin holds.
    #[error("Session {session_id} already taken over by '{owner}'")]
    AlreadyTakenOver { session_id: Uuid, owner: String },

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}
