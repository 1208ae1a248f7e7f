// src/tasks/mod.rs

pub mod idle_reaper;

pub use idle_reaper::{run_idle_sweep, spawn_idle_reaper};
