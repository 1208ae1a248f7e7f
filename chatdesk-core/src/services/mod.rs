// src/services/mod.rs

pub mod chat_service;
pub mod message_service;
pub mod session_service;
pub mod takeover_service;
pub mod visitor_service;

pub use chat_service::{AssistantTurn, ChatService, InboundTurn};
pub use message_service::MessageService;
pub use session_service::{ResolvedSession, SessionService};
pub use takeover_service::TakeoverService;
pub use visitor_service::VisitorService;
