// src/repositories/memory/mod.rs
//
// Mutex-guarded in-memory implementations of the repository traits.
// They back the hermetic test harness; the single mutex per store makes
// the takeover check-and-set naturally atomic.

pub mod message;
pub mod session;
pub mod visitor;

pub use message::MemoryChatMessageRepository;
pub use session::MemoryChatSessionRepository;
pub use visitor::MemoryVisitorRepository;
