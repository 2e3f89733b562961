//! Core module: the turn-taking runtime.
//!
//! - `events`: agent event types and the typed publish/subscribe bus
//! - `history`: the append-only transcript with bounded retention
//! - `interrupt`: cooperative cancellation token
//! - `session`: per-session configuration and token accounting
//! - `orchestrator`: the turn loop composing all of the above

pub mod events;
pub mod history;
pub mod interrupt;
pub mod orchestrator;
pub mod session;
