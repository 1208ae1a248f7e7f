// src/repositories/postgres/mod.rs

pub mod message;
pub mod session;
pub mod visitor;

pub use message::PostgresChatMessageRepository;
pub use session::PostgresChatSessionRepository;
pub use visitor::PostgresVisitorRepository;
