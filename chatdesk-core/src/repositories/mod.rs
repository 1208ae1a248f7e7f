// src/repositories/mod.rs

pub mod memory;
pub mod postgres;

pub use memory::{
    MemoryChatMessageRepository, MemoryChatSessionRepository, MemoryVisitorRepository,
};
pub use postgres::{
    PostgresChatMessageRepository, PostgresChatSessionRepository, PostgresVisitorRepository,
};
