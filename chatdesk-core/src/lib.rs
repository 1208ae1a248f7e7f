// src/lib.rs

pub mod db;
pub mod eventbus;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use chatdesk_common::error::Error;
pub use db::Database;
