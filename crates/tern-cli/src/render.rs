//! Plain stdout/stderr rendering of agent events.
//!
//! Output contract:
//! - `TextDelta` → stdout, written incrementally
//! - `ToolStart`, `ToolEnd`, `Error` → stderr status lines

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tern_core::core::events::{AgentEvent, EventBus, EventKind, Subscription};

#[derive(Default)]
struct RenderState {
    /// Whether assistant text is pending a trailing newline.
    needs_newline: bool,
    /// Tool start times keyed by tool_use id, for duration reporting.
    tool_started: HashMap<String, Instant>,
}

/// Subscribes to a bus and prints events as they arrive.
///
/// Dropping the renderer detaches nothing; subscriptions are held for
/// the lifetime of the value.
pub struct Renderer {
    state: Arc<Mutex<RenderState>>,
    _subscriptions: Vec<Subscription>,
}

impl Renderer {
    pub fn attach(bus: &EventBus) -> Self {
        let state = Arc::new(Mutex::new(RenderState::default()));
        let subscriptions = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let state = Arc::clone(&state);
                bus.on(kind, move |event| render_event(&state, event))
            })
            .collect();
        Self {
            state,
            _subscriptions: subscriptions,
        }
    }

    /// Terminates any pending assistant line with a newline.
    pub fn finish(&self) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.needs_newline {
            println!();
            state.needs_newline = false;
        }
    }
}

fn render_event(state: &Arc<Mutex<RenderState>>, event: &AgentEvent) {
    let mut state = match state.lock() {
        Ok(state) => state,
        Err(poisoned) => poisoned.into_inner(),
    };

    match event {
        AgentEvent::TextDelta { text } => {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{text}");
            let _ = stdout.flush();
            state.needs_newline = true;
        }
        AgentEvent::ToolStart {
            tool_id, tool_name, ..
        } => {
            if state.needs_newline {
                println!();
                state.needs_newline = false;
            }
            state.tool_started.insert(tool_id.clone(), Instant::now());
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "⚙ Running {tool_name}...");
            let _ = stderr.flush();
        }
        AgentEvent::ToolEnd { tool_id, error, .. } => {
            let duration = state
                .tool_started
                .remove(tool_id)
                .map(|start| format!(" ({:.2}s)", start.elapsed().as_secs_f64()))
                .unwrap_or_default();
            let mut stderr = std::io::stderr();
            let _ = match error {
                None => writeln!(stderr, " Done.{duration}"),
                Some(message) => writeln!(stderr, " Failed: {message}{duration}"),
            };
        }
        AgentEvent::Error { error } => {
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "Error [{}]: {}", error.code, error.message);
            if let Some(details) = &error.details {
                let _ = writeln!(stderr, "  Details: {details}");
            }
        }
        // Lifecycle and usage events are not displayed in plain mode.
        AgentEvent::StateChange { .. } | AgentEvent::TokenUsage { .. } => {}
    }
}
