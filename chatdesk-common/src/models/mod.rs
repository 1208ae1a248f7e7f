pub mod message;
pub mod session;
pub mod visitor;

pub use message::{ChatMessage, MessageRole, NewChatMessage};
pub use session::{
    ChatSession, SessionLifecycle, SessionOwnership, SessionStatus, TakeoverOutcome,
};
pub use visitor::{
    ContactCapture, NewPageView, PageView, Visitor, VisitorContact, VisitorProfile,
    VisitorSummary,
};
