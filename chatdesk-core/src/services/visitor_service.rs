// src/services/visitor_service.rs

use std::sync::Arc;

use tracing::debug;

use chatdesk_common::models::{
    ContactCapture, NewPageView, PageView, Visitor, VisitorContact, VisitorProfile,
};
use chatdesk_common::traits::repository_traits::VisitorRepository;
use chatdesk_common::Error;

/// The visitor registry: idempotent identity upserts plus the one
/// contact record per visitor.
pub struct VisitorService {
    visitor_repo: Arc<dyn VisitorRepository>,
}

impl VisitorService {
    pub fn new(visitor_repo: Arc<dyn VisitorRepository>) -> Self {
        Self { visitor_repo }
    }

    /// Upsert the visitor record. `new_session` signals that this call
    /// opens a new chat session and the visit counter should bump; the
    /// orchestrator computes it from the session store.
    pub async fn get_or_create_visitor(
        &self,
        profile: &VisitorProfile,
        new_session: bool,
    ) -> Result<Visitor, Error> {
        debug!(
            "get_or_create_visitor('{}', new_session={})",
            profile.visitor_id, new_session
        );
        self.visitor_repo.upsert(profile, new_session).await
    }

    /// Idempotent upsert of the visitor's single contact record.
    pub async fn update_visitor_contact(
        &self,
        capture: &ContactCapture,
    ) -> Result<VisitorContact, Error> {
        if self.visitor_repo.get(&capture.visitor_id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "visitor '{}'",
                capture.visitor_id
            )));
        }
        self.visitor_repo.set_contact(capture).await
    }

    pub async fn has_contact_on_file(&self, visitor_id: &str) -> Result<bool, Error> {
        Ok(self.visitor_repo.get_contact(visitor_id).await?.is_some())
    }

    pub async fn get_contact(&self, visitor_id: &str) -> Result<Option<VisitorContact>, Error> {
        self.visitor_repo.get_contact(visitor_id).await
    }

    pub async fn record_page_view(&self, view: &NewPageView) -> Result<PageView, Error> {
        self.visitor_repo.record_page_view(view).await
    }
}
