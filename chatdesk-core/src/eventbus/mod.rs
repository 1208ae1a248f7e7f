//! src/eventbus/mod.rs
//!
//! In-process broadcast hub that fans chat events out to dashboard
//! observers. Delivery is best-effort at-most-once per observer: events
//! are pushed with `try_send` into one bounded queue per observer, so a
//! slow consumer loses events instead of stalling the chat pipeline.

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

use chatdesk_common::models::{ChatMessage, VisitorSummary};

/// Default size for each observer's queue.
pub const DEFAULT_OBSERVER_BUFFER: usize = 256;

/// Everything the dashboard can be told about live chat activity.
///
/// Serializes to the wire shape the admin dashboard consumes: a `type`
/// tag plus camelCase payload fields.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ChatEvent {
    NewMessage {
        session_id: Uuid,
        message: ChatMessage,
        /// Session token of the client that caused the message, so a
        /// widget can recognize its own traffic. Absent for admin
        /// messages.
        #[serde(skip_serializing_if = "Option::is_none")]
        origin_token: Option<String>,
    },
    SessionStarted {
        session_id: Uuid,
        visitor: VisitorSummary,
    },
    ContactCollected {
        session_id: Uuid,
        name: String,
        contact: String,
    },
    AdminJoined {
        session_id: Uuid,
        admin_id: String,
    },
    AdminLeft {
        session_id: Uuid,
    },
}

impl ChatEvent {
    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::NewMessage { .. } => "new_message",
            ChatEvent::SessionStarted { .. } => "session_started",
            ChatEvent::ContactCollected { .. } => "contact_collected",
            ChatEvent::AdminJoined { .. } => "admin_joined",
            ChatEvent::AdminLeft { .. } => "admin_left",
        }
    }

    /// The session this event belongs to, used for observer filtering.
    pub fn session_id(&self) -> Uuid {
        match self {
            ChatEvent::NewMessage { session_id, .. }
            | ChatEvent::SessionStarted { session_id, .. }
            | ChatEvent::ContactCollected { session_id, .. }
            | ChatEvent::AdminJoined { session_id, .. }
            | ChatEvent::AdminLeft { session_id } => *session_id,
        }
    }
}

pub type ObserverId = Uuid;

struct Observer {
    session_filter: Option<Uuid>,
    tx: mpsc::Sender<ChatEvent>,
}

/// Observer registry plus fan-out.
///
/// One instance is shared by the services that publish and the transports
/// that subscribe; it is passed in explicitly wherever it is needed, and
/// tests build a fresh hub each so suites stay isolated.
pub struct BroadcastHub {
    observers: DashMap<ObserverId, Observer>,
    buffer_size: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_OBSERVER_BUFFER)
    }

    /// `buffer_size` is the per-observer queue depth; events past it are
    /// dropped for that observer.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        BroadcastHub {
            observers: DashMap::new(),
            buffer_size,
        }
    }

    /// Registers an observer. `session_filter = None` receives every
    /// event, `Some(id)` only that session's events.
    pub fn subscribe(
        &self,
        session_filter: Option<Uuid>,
    ) -> (ObserverId, mpsc::Receiver<ChatEvent>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let observer_id = Uuid::new_v4();
        self.observers
            .insert(observer_id, Observer { session_filter, tx });
        debug!(
            "observer {} subscribed (filter={:?})",
            observer_id, session_filter
        );
        (observer_id, rx)
    }

    /// `subscribe` wrapped into a `Stream`, for transports that forward
    /// events as server-sent frames.
    pub fn subscribe_stream(
        &self,
        session_filter: Option<Uuid>,
    ) -> (ObserverId, ReceiverStream<ChatEvent>) {
        let (observer_id, rx) = self.subscribe(session_filter);
        (observer_id, ReceiverStream::new(rx))
    }

    /// Idempotent; transports call this from every disconnect path.
    pub fn unsubscribe(&self, observer_id: ObserverId) {
        if self.observers.remove(&observer_id).is_some() {
            debug!("observer {} unsubscribed", observer_id);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Delivers `event` to every all-sessions observer and every observer
    /// filtered to its session, without blocking. A full queue drops the
    /// event for that observer; a closed receiver removes the observer.
    pub fn broadcast(&self, event: ChatEvent) {
        let session_id = event.session_id();
        self.observers.retain(|observer_id, observer| {
            let matches = observer
                .session_filter
                .is_none_or(|filter| filter == session_id);
            if !matches {
                return true;
            }
            match observer.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "observer {} queue full, dropping {}",
                        observer_id,
                        event.event_type()
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("observer {} gone, removing", observer_id);
                    false
                }
            }
        });
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
