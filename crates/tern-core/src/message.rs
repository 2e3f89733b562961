//! Conversation data model shared by the transcript, the orchestrator,
//! and the provider wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content block in a message.
///
/// Closed sum so every consumer matches exhaustively; adding a new content
/// kind is a compile-time-checked exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

/// One transcript entry. Never mutated after creation; the constructors
/// below are the only way messages are built, so content is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Creates an assistant message from content blocks (text and tool use).
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        debug_assert!(!content.is_empty(), "assistant message without content");
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Creates a user message carrying tool results for a completed round.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        debug_assert!(
            results
                .iter()
                .all(|b| matches!(b, ContentBlock::ToolResult { .. })),
            "tool_results message may only carry ToolResult blocks"
        );
        Self {
            role: Role::User,
            content: results,
        }
    }

    /// Returns true if the message's first block is a tool result.
    pub fn starts_with_tool_result(&self) -> bool {
        matches!(self.content.first(), Some(ContentBlock::ToolResult { .. }))
    }
}

/// Why the model stopped producing output for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    /// Stop reason this version does not know about. Treated as end of
    /// turn for loop-control purposes.
    Other,
}

impl StopReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::Other,
        }
    }
}

/// Token usage for one model turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Tool made available to the model, in the wire shape the Messages
/// API expects (`input_schema` is a JSON-schema object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}
