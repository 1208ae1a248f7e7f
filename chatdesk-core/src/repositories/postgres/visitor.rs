// src/repositories/postgres/visitor.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use chatdesk_common::models::{
    ContactCapture, NewPageView, PageView, Visitor, VisitorContact, VisitorProfile,
};
use chatdesk_common::traits::repository_traits::VisitorRepository;
use chatdesk_common::Error;

pub struct PostgresVisitorRepository {
    pool: Pool<Postgres>,
}

impl PostgresVisitorRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitorRepository for PostgresVisitorRepository {
    async fn get(&self, visitor_id: &str) -> Result<Option<Visitor>, Error> {
        let row = sqlx::query_as::<_, Visitor>(
            r#"
            SELECT visitor_id,
                   ip_address,
                   user_agent,
                   city,
                   country,
                   first_seen_at,
                   last_seen_at,
                   total_visits
            FROM visitors
            WHERE visitor_id = $1
            "#,
        )
        .bind(visitor_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert(&self, profile: &VisitorProfile, new_session: bool) -> Result<Visitor, Error> {
        // COALESCE keeps previously stored values when the request did
        // not carry them; the counter bumps only for a new session.
        let visitor = sqlx::query_as::<_, Visitor>(
            r#"
            INSERT INTO visitors (
                visitor_id, ip_address, user_agent, city, country,
                first_seen_at, last_seen_at, total_visits
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, 1)
            ON CONFLICT (visitor_id) DO UPDATE SET
                ip_address   = COALESCE(EXCLUDED.ip_address, visitors.ip_address),
                user_agent   = COALESCE(EXCLUDED.user_agent, visitors.user_agent),
                city         = COALESCE(EXCLUDED.city, visitors.city),
                country      = COALESCE(EXCLUDED.country, visitors.country),
                last_seen_at = EXCLUDED.last_seen_at,
                total_visits = visitors.total_visits + CASE WHEN $7 THEN 1 ELSE 0 END
            RETURNING visitor_id, ip_address, user_agent, city, country,
                      first_seen_at, last_seen_at, total_visits
            "#,
        )
        .bind(&profile.visitor_id)
        .bind(&profile.ip_address)
        .bind(&profile.user_agent)
        .bind(&profile.city)
        .bind(&profile.country)
        .bind(Utc::now())
        .bind(new_session)
        .fetch_one(&self.pool)
        .await?;
        Ok(visitor)
    }

    async fn set_contact(&self, capture: &ContactCapture) -> Result<VisitorContact, Error> {
        let contact = sqlx::query_as::<_, VisitorContact>(
            r#"
            INSERT INTO visitor_contacts (
                contact_id, visitor_id, name, contact, message, source,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (visitor_id) DO UPDATE SET
                name       = EXCLUDED.name,
                contact    = EXCLUDED.contact,
                message    = COALESCE(EXCLUDED.message, visitor_contacts.message),
                source     = EXCLUDED.source,
                updated_at = EXCLUDED.updated_at
            RETURNING contact_id, visitor_id, name, contact, message, source,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&capture.visitor_id)
        .bind(&capture.name)
        .bind(&capture.contact)
        .bind(&capture.message)
        .bind(&capture.source)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn get_contact(&self, visitor_id: &str) -> Result<Option<VisitorContact>, Error> {
        let row = sqlx::query_as::<_, VisitorContact>(
            r#"
            SELECT contact_id, visitor_id, name, contact, message, source,
                   created_at, updated_at
            FROM visitor_contacts
            WHERE visitor_id = $1
            "#,
        )
        .bind(visitor_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn record_page_view(&self, view: &NewPageView) -> Result<PageView, Error> {
        let page_view = sqlx::query_as::<_, PageView>(
            r#"
            INSERT INTO page_views (view_id, visitor_id, path, referrer, viewed_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING view_id, visitor_id, path, referrer, viewed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&view.visitor_id)
        .bind(&view.path)
        .bind(&view.referrer)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(page_view)
    }
}
