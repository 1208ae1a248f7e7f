// src/repositories/memory/visitor.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use chatdesk_common::models::{
    ContactCapture, NewPageView, PageView, Visitor, VisitorContact, VisitorProfile,
};
use chatdesk_common::traits::repository_traits::VisitorRepository;
use chatdesk_common::Error;

#[derive(Default)]
struct VisitorState {
    visitors: HashMap<String, Visitor>,
    contacts: HashMap<String, VisitorContact>,
    page_views: Vec<PageView>,
}

#[derive(Default)]
pub struct MemoryVisitorRepository {
    state: Mutex<VisitorState>,
}

impl MemoryVisitorRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitorRepository for MemoryVisitorRepository {
    async fn get(&self, visitor_id: &str) -> Result<Option<Visitor>, Error> {
        let state = self.state.lock().await;
        Ok(state.visitors.get(visitor_id).cloned())
    }

    async fn upsert(&self, profile: &VisitorProfile, new_session: bool) -> Result<Visitor, Error> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let visitor = match state.visitors.get_mut(&profile.visitor_id) {
            Some(existing) => {
                // Absent fields never erase stored values.
                if profile.ip_address.is_some() {
                    existing.ip_address = profile.ip_address.clone();
                }
                if profile.user_agent.is_some() {
                    existing.user_agent = profile.user_agent.clone();
                }
                if profile.city.is_some() {
                    existing.city = profile.city.clone();
                }
                if profile.country.is_some() {
                    existing.country = profile.country.clone();
                }
                existing.last_seen_at = now;
                if new_session {
                    existing.total_visits += 1;
                }
                existing.clone()
            }
            None => {
                let visitor = Visitor {
                    visitor_id: profile.visitor_id.clone(),
                    ip_address: profile.ip_address.clone(),
                    user_agent: profile.user_agent.clone(),
                    city: profile.city.clone(),
                    country: profile.country.clone(),
                    first_seen_at: now,
                    last_seen_at: now,
                    total_visits: 1,
                };
                state
                    .visitors
                    .insert(profile.visitor_id.clone(), visitor.clone());
                visitor
            }
        };
        Ok(visitor)
    }

    async fn set_contact(&self, capture: &ContactCapture) -> Result<VisitorContact, Error> {
        let mut state = self.state.lock().await;
        // Mirror the foreign key the Postgres schema enforces.
        if !state.visitors.contains_key(&capture.visitor_id) {
            return Err(Error::NotFound(format!("visitor '{}'", capture.visitor_id)));
        }

        let now = Utc::now();
        let contact = match state.contacts.get_mut(&capture.visitor_id) {
            Some(existing) => {
                existing.name = capture.name.clone();
                existing.contact = capture.contact.clone();
                if capture.message.is_some() {
                    existing.message = capture.message.clone();
                }
                existing.source = capture.source.clone();
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let contact = VisitorContact {
                    contact_id: Uuid::new_v4(),
                    visitor_id: capture.visitor_id.clone(),
                    name: capture.name.clone(),
                    contact: capture.contact.clone(),
                    message: capture.message.clone(),
                    source: capture.source.clone(),
                    created_at: now,
                    updated_at: now,
                };
                state
                    .contacts
                    .insert(capture.visitor_id.clone(), contact.clone());
                contact
            }
        };
        Ok(contact)
    }

    async fn get_contact(&self, visitor_id: &str) -> Result<Option<VisitorContact>, Error> {
        let state = self.state.lock().await;
        Ok(state.contacts.get(visitor_id).cloned())
    }

    async fn record_page_view(&self, view: &NewPageView) -> Result<PageView, Error> {
        let mut state = self.state.lock().await;
        if !state.visitors.contains_key(&view.visitor_id) {
            return Err(Error::NotFound(format!("visitor '{}'", view.visitor_id)));
        }
        let page_view = PageView {
            view_id: Uuid::new_v4(),
            visitor_id: view.visitor_id.clone(),
            path: view.path.clone(),
            referrer: view.referrer.clone(),
            viewed_at: Utc::now(),
        };
        state.page_views.push(page_view.clone());
        Ok(page_view)
    }
}
