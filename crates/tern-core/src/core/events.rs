//! Agent event types and the synchronous publish/subscribe bus.
//!
//! Events are serializable for a future JSON output mode.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Usage;

/// Lifecycle state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Idle,
    Running,
    Error,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Error categories for `AgentEvent::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A tool executor failed.
    ToolError,
    /// The model API request or stream failed.
    ApiError,
    /// A request was rejected before reaching the provider.
    ValidationError,
    /// Anything that does not fit the categories above.
    Unknown,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ToolError => "tool_error",
            Self::ApiError => "api_error",
            Self::ValidationError => "validation_error",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Structured error surfaced on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentError {
    pub code: ErrorCode,
    /// One-line summary.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AgentError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Events emitted by the orchestrator during a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Incremental text chunk from the assistant.
    TextDelta { text: String },

    /// A tool invocation is about to execute. The input is fully parsed.
    ToolStart {
        tool_id: String,
        tool_name: String,
        input: Value,
    },

    /// A tool invocation finished. Exactly one of `result`/`error` is set.
    ToolEnd {
        tool_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// The orchestrator changed state.
    StateChange { state: AgentState },

    /// Token usage for one completed model turn.
    TokenUsage { input_tokens: u64, output_tokens: u64 },

    /// An error occurred during execution.
    Error { error: AgentError },
}

impl AgentEvent {
    #[must_use]
    pub fn token_usage(usage: Usage) -> Self {
        Self::TokenUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }

    /// Discriminant used to key bus subscriptions.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TextDelta { .. } => EventKind::TextDelta,
            Self::ToolStart { .. } => EventKind::ToolStart,
            Self::ToolEnd { .. } => EventKind::ToolEnd,
            Self::StateChange { .. } => EventKind::StateChange,
            Self::TokenUsage { .. } => EventKind::TokenUsage,
            Self::Error { .. } => EventKind::Error,
        }
    }
}

/// Field-less discriminant of [`AgentEvent`], used for subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TextDelta,
    ToolStart,
    ToolEnd,
    StateChange,
    TokenUsage,
    Error,
}

impl EventKind {
    pub const ALL: [Self; 6] = [
        Self::TextDelta,
        Self::ToolStart,
        Self::ToolEnd,
        Self::StateChange,
        Self::TokenUsage,
        Self::Error,
    ];
}

type Handler = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

struct Entry {
    token: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    listeners: HashMap<EventKind, Vec<Entry>>,
    next_token: u64,
}

/// Synchronous typed pub/sub bus.
///
/// `emit` calls every handler registered for the event's kind, in
/// registration order, on the emitting thread. The listener list is
/// snapshotted before iteration, so handlers may subscribe or
/// unsubscribe from inside a callback; such changes take effect for
/// the next emit. Handler panics are not caught.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind`.
    ///
    /// # Panics
    /// Panics if the bus mutex is poisoned.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let token = inner.next_token;
        inner.next_token += 1;
        inner.listeners.entry(kind).or_default().push(Entry {
            token,
            handler: Arc::new(handler),
        });
        Subscription {
            bus: self.inner.clone(),
            kind,
            token,
        }
    }

    /// Removes the handler registered under `token` for `kind`.
    ///
    /// Unknown tokens are ignored.
    ///
    /// # Panics
    /// Panics if the bus mutex is poisoned.
    pub fn off(&self, kind: EventKind, token: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entries) = inner.listeners.get_mut(&kind) {
            entries.retain(|entry| entry.token != token);
        }
    }

    /// Dispatches `event` to every listener of its kind.
    ///
    /// # Panics
    /// Panics if the bus mutex is poisoned.
    pub fn emit(&self, event: &AgentEvent) {
        let handlers: Vec<Handler> = {
            let inner = self.inner.lock().unwrap();
            inner
                .listeners
                .get(&event.kind())
                .map(|entries| entries.iter().map(|e| Arc::clone(&e.handler)).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(event);
        }
    }

    /// Drops every listener. Idempotent.
    ///
    /// # Panics
    /// Panics if the bus mutex is poisoned.
    pub fn remove_all_listeners(&self) {
        self.inner.lock().unwrap().listeners.clear();
    }
}

/// Handle returned by [`EventBus::on`].
///
/// Unsubscription is explicit; dropping the handle leaves the
/// listener registered.
pub struct Subscription {
    bus: Arc<Mutex<BusInner>>,
    kind: EventKind,
    token: u64,
}

impl Subscription {
    /// Token identifying this registration, usable with [`EventBus::off`].
    #[must_use]
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Removes this listener from the bus.
    ///
    /// # Panics
    /// Panics if the bus mutex is poisoned.
    pub fn unsubscribe(self) {
        let mut inner = self.bus.lock().unwrap();
        if let Some(entries) = inner.listeners.get_mut(&self.kind) {
            entries.retain(|entry| entry.token != self.token);
        }
    }
}
