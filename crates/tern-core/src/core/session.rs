//! Per-session configuration and cumulative token accounting.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::message::Usage;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MAX_TURNS: u32 = 25;

/// Settings for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
    /// Upper bound on model turns per submission.
    pub max_turns: u32,
    pub max_history_messages: usize,
    pub tool_timeout: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
            max_turns: DEFAULT_MAX_TURNS,
            max_history_messages: crate::core::history::DEFAULT_MAX_MESSAGES,
            tool_timeout: None,
        }
    }
}

/// Snapshot of session-level counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub model: String,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub working_directory: PathBuf,
}

/// Long-lived session state shared across submissions.
///
/// Token counters are monotone; they accumulate across turns and are
/// never reset, matching the lifetime of the orchestrator.
pub struct Session {
    config: AgentConfig,
    working_directory: PathBuf,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

impl Session {
    #[must_use]
    pub fn new(config: AgentConfig, working_directory: PathBuf) -> Self {
        Self {
            config,
            working_directory,
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    #[must_use]
    pub fn working_directory(&self) -> &PathBuf {
        &self.working_directory
    }

    pub fn add_usage(&self, usage: &Usage) {
        self.input_tokens
            .fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens, Ordering::Relaxed);
    }

    #[must_use]
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            model: self.config.model.clone(),
            total_input_tokens: self.input_tokens.load(Ordering::Relaxed),
            total_output_tokens: self.output_tokens.load(Ordering::Relaxed),
            working_directory: self.working_directory.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_accumulates_across_turns() {
        let session = Session::new(AgentConfig::default(), PathBuf::from("/tmp"));
        session.add_usage(&Usage {
            input_tokens: 10,
            output_tokens: 5,
        });
        session.add_usage(&Usage {
            input_tokens: 7,
            output_tokens: 3,
        });

        let info = session.info();
        assert_eq!(info.total_input_tokens, 17);
        assert_eq!(info.total_output_tokens, 8);
    }

    #[test]
    fn info_reports_model_and_working_directory() {
        let config = AgentConfig {
            model: "claude-test".to_string(),
            ..AgentConfig::default()
        };
        let session = Session::new(config, PathBuf::from("/work"));

        let info = session.info();
        assert_eq!(info.model, "claude-test");
        assert_eq!(info.working_directory, PathBuf::from("/work"));
        assert_eq!(info.total_input_tokens, 0);
    }
}
