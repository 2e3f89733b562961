//! Anthropic Messages API backend.

mod client;
mod sse;
mod types;

pub use client::{AnthropicClient, AnthropicConfig, DEFAULT_BASE_URL};
pub use sse::SseParser;
