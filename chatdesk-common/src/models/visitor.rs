// chatdesk-common/src/models/visitor.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An anonymous browser identity, keyed by the client-generated visitor id.
///
/// The row is created on first contact and only ever enriched afterwards.
/// `total_visits` counts chat sessions, not page loads, and never
/// decreases.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub visitor_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub total_visits: i32,
}

/// Compact visitor details carried on `session_started` events.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSummary {
    pub visitor_id: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub total_visits: i32,
}

impl From<&Visitor> for VisitorSummary {
    fn from(visitor: &Visitor) -> Self {
        VisitorSummary {
            visitor_id: visitor.visitor_id.clone(),
            city: visitor.city.clone(),
            country: visitor.country.clone(),
            total_visits: visitor.total_visits,
        }
    }
}

/// Request-derived attributes accompanying an inbound turn or page view.
/// Everything but the id is best effort; absent fields never erase
/// previously stored values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorProfile {
    pub visitor_id: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Contact details captured for a visitor, at most one record each.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VisitorContact {
    pub contact_id: Uuid,
    pub visitor_id: String,
    pub name: String,
    pub contact: String,
    pub message: Option<String>,
    /// Where the capture came from, e.g. "chat" or "form".
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for the idempotent contact upsert.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCapture {
    pub visitor_id: String,
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_capture_source")]
    pub source: String,
}

fn default_capture_source() -> String {
    "form".to_string()
}

/// One recorded page load for a visitor.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub view_id: Uuid,
    pub visitor_id: String,
    pub path: String,
    pub referrer: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

/// Payload for recording a page view; id and timestamp are assigned by
/// the repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPageView {
    pub visitor_id: String,
    pub path: String,
    #[serde(default)]
    pub referrer: Option<String>,
}
