//! Core tern library (orchestrator, transcript, tools, provider, config).

pub mod config;
pub mod core;
pub mod message;
pub mod providers;
pub mod tools;
