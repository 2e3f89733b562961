//! Append-only transcript with bounded retention.

use crate::message::{ContentBlock, Message, Role};

pub const DEFAULT_MAX_MESSAGES: usize = 100;

/// Ordered conversation transcript.
///
/// Every append trims the oldest whole messages until the transcript is
/// at or under `max_messages`. Trimming never splits a message, and it
/// repairs the head afterwards: a surviving message that leads with a
/// `tool_result` block is dropped too, since its `tool_use` context is
/// gone.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    messages: Vec<Message>,
    max_messages: usize,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl MessageHistory {
    #[must_use]
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: max_messages.max(1),
        }
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    pub fn add_assistant_message(&mut self, content: Vec<ContentBlock>) {
        self.push(Message::assistant(content));
    }

    /// Appends a user message carrying a single tool result.
    pub fn add_tool_result(
        &mut self,
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) {
        self.push(Message::tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }]));
    }

    /// Appends one user message carrying every result of a tool round.
    ///
    /// The wire format requires all results for a round in a single
    /// user message; this is the form the orchestrator uses.
    pub fn add_tool_results(&mut self, results: Vec<ContentBlock>) {
        if results.is_empty() {
            return;
        }
        self.push(Message::tool_results(results));
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.trim();
    }

    fn trim(&mut self) {
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
        }
        // Head repair: an orphaned tool_result would be rejected by the API.
        while self
            .messages
            .first()
            .is_some_and(Message::starts_with_tool_result)
        {
            self.messages.remove(0);
        }
    }

    /// Cloned snapshot in chronological order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_result_block(id: &str) -> ContentBlock {
        ContentBlock::ToolResult {
            tool_use_id: id.to_string(),
            content: "ok".to_string(),
            is_error: false,
        }
    }

    #[test]
    fn appends_preserve_order() {
        let mut history = MessageHistory::default();
        history.add_user_message("hello");
        history.add_assistant_message(vec![ContentBlock::Text {
            text: "hi".to_string(),
        }]);

        let messages = history.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn trims_oldest_whole_messages() {
        let mut history = MessageHistory::new(3);
        for i in 0..5 {
            history.add_user_message(format!("message {i}"));
        }

        let messages = history.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[0].content,
            vec![ContentBlock::Text {
                text: "message 2".to_string()
            }]
        );
    }

    #[test]
    fn trimming_drops_orphaned_tool_result_head() {
        let mut history = MessageHistory::new(2);
        history.add_user_message("run it");
        history.add_assistant_message(vec![ContentBlock::ToolUse {
            id: "tool_1".to_string(),
            name: "run_shell".to_string(),
            input: serde_json::json!({"command": "ls"}),
        }]);
        // This append trims "run it", leaving the tool_use at the head.
        history.add_tool_results(vec![tool_result_block("tool_1")]);
        assert_eq!(history.len(), 2);

        // The next append trims the tool_use; the orphaned result goes too.
        history.add_user_message("next");
        let messages = history.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].content,
            vec![ContentBlock::Text {
                text: "next".to_string()
            }]
        );
    }

    #[test]
    fn add_tool_results_groups_blocks_in_one_message() {
        let mut history = MessageHistory::default();
        history.add_tool_results(vec![tool_result_block("a"), tool_result_block("b")]);

        let messages = history.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content.len(), 2);
    }

    #[test]
    fn add_tool_results_ignores_empty_rounds() {
        let mut history = MessageHistory::default();
        history.add_tool_results(Vec::new());
        assert!(history.is_empty());
    }

    #[test]
    fn clear_empties_the_transcript() {
        let mut history = MessageHistory::default();
        history.add_user_message("hello");
        history.clear();
        assert!(history.is_empty());
    }
}
