//! The turn loop: submissions, streaming, tool dispatch.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::time::timeout;

use crate::core::events::{AgentError, AgentEvent, AgentState, ErrorCode, EventBus};
use crate::core::history::MessageHistory;
use crate::core::interrupt::{InterruptToken, InterruptedError};
use crate::core::session::{AgentConfig, Session, SessionInfo};
use crate::message::{ContentBlock, Message, StopReason, ToolDefinition, Usage};
use crate::providers::{ContentBlockType, ModelClient, ModelStream, ProviderError, StreamEvent};
use crate::tools::{ToolContext, ToolHandler, ToolRegistry};

/// Timeout for stream polling to allow interrupt checks.
const STREAM_POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Builder for accumulating tool use data from streaming events.
#[derive(Debug, Clone)]
struct ToolUseBuilder {
    index: usize,
    id: String,
    name: String,
    input_json: String,
    /// Set once the block closes: parsed input, or the parse failure.
    finalized: Option<Result<Value, String>>,
}

impl ToolUseBuilder {
    /// Parses the accumulated input JSON. An empty accumulation means a
    /// no-argument call and parses as an empty object.
    fn parse_input(&self) -> Result<Value, String> {
        if self.input_json.trim().is_empty() {
            Ok(Value::Object(serde_json::Map::new()))
        } else {
            serde_json::from_str(&self.input_json)
                .map_err(|err| format!("malformed tool input: {err}"))
        }
    }

    /// Input for transcript and event purposes; an empty object when
    /// the accumulated JSON never parsed.
    fn input_value(&self) -> Value {
        match &self.finalized {
            Some(Ok(input)) => input.clone(),
            _ => Value::Object(serde_json::Map::new()),
        }
    }
}

/// Accumulated content of one model turn.
#[derive(Debug, Default)]
struct TurnState {
    text: String,
    tool_uses: Vec<ToolUseBuilder>,
    stop_reason: Option<StopReason>,
    usage: Usage,
}

impl TurnState {
    fn find_tool_use_mut(&mut self, index: usize) -> Option<&mut ToolUseBuilder> {
        self.tool_uses.iter_mut().find(|t| t.index == index)
    }

    fn needs_tool_execution(&self) -> bool {
        self.stop_reason == Some(StopReason::ToolUse) && !self.tool_uses.is_empty()
    }
}

/// Drives multi-turn conversations against a streaming model.
///
/// All shared state lives behind locks so the orchestrator can be held
/// in an `Arc` and poked from multiple tasks: `submit` from the REPL
/// loop, `interrupt` from a signal handler.
pub struct Orchestrator {
    session: Session,
    client: Arc<dyn ModelClient>,
    registry: Mutex<ToolRegistry>,
    state: Mutex<AgentState>,
    history: Mutex<MessageHistory>,
    bus: EventBus,
    interrupt: InterruptToken,
    tool_ctx: ToolContext,
}

impl Orchestrator {
    /// Creates an orchestrator with the builtin tools registered.
    #[must_use]
    pub fn new(config: AgentConfig, root: PathBuf, client: Arc<dyn ModelClient>) -> Self {
        let history = MessageHistory::new(config.max_history_messages);
        let tool_ctx = ToolContext::new(root.clone(), config.tool_timeout);
        Self {
            session: Session::new(config, root),
            client,
            registry: Mutex::new(ToolRegistry::builtins()),
            state: Mutex::new(AgentState::Idle),
            history: Mutex::new(history),
            bus: EventBus::new(),
            interrupt: InterruptToken::new(),
            tool_ctx,
        }
    }

    /// The event bus this orchestrator publishes to.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The cancellation token polled by the turn loop.
    ///
    /// Hand a clone to a signal handler to wire up Ctrl+C.
    #[must_use]
    pub fn interrupt_token(&self) -> InterruptToken {
        self.interrupt.clone()
    }

    /// Current lifecycle state.
    ///
    /// # Panics
    /// Panics if the state mutex is poisoned.
    pub fn state(&self) -> AgentState {
        *self.state.lock().unwrap()
    }

    /// Cloned transcript snapshot.
    ///
    /// # Panics
    /// Panics if the history mutex is poisoned.
    pub fn messages(&self) -> Vec<Message> {
        self.history.lock().unwrap().messages()
    }

    /// Drops the whole transcript.
    ///
    /// # Panics
    /// Panics if the history mutex is poisoned.
    pub fn clear_history(&self) {
        self.history.lock().unwrap().clear();
    }

    /// Session counters and settings snapshot.
    #[must_use]
    pub fn session_info(&self) -> SessionInfo {
        self.session.info()
    }

    /// Registers a tool, replacing any builtin of the same name.
    ///
    /// # Panics
    /// Panics if the registry mutex is poisoned.
    pub fn register_tool(&self, definition: ToolDefinition, handler: ToolHandler) {
        self.registry.lock().unwrap().register(definition, handler);
    }

    /// Runs one submission to completion.
    ///
    /// A no-op while a submission is already running. Failures are
    /// reported through the bus (`Error` event plus the `Error` state),
    /// never returned; cancellation ends in `Idle` with no error event.
    pub async fn submit(&self, user_message: &str) {
        if !self.try_begin_running() {
            tracing::debug!("submission ignored: already running");
            return;
        }

        self.interrupt.reset();
        self.history.lock().unwrap().add_user_message(user_message);

        match self.run_conversation().await {
            Ok(()) => self.set_state(AgentState::Idle),
            Err(err) if err.is::<InterruptedError>() => self.set_state(AgentState::Idle),
            Err(err) => {
                let error = classify_error(&err);
                tracing::warn!(code = ?error.code, "submission failed: {}", error.message);
                self.set_state(AgentState::Error);
                self.bus.emit(&AgentEvent::Error { error });
            }
        }
    }

    /// Requests cancellation of the in-flight submission.
    ///
    /// Safe to call when idle; the state transition is emitted at most
    /// once per actual change.
    pub fn interrupt(&self) {
        self.interrupt.trigger();
        self.set_state(AgentState::Idle);
    }

    fn try_begin_running(&self) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            if *state == AgentState::Running {
                return false;
            }
            *state = AgentState::Running;
        }
        self.bus.emit(&AgentEvent::StateChange {
            state: AgentState::Running,
        });
        true
    }

    fn set_state(&self, new_state: AgentState) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == new_state {
                return;
            }
            *state = new_state;
        }
        self.bus
            .emit(&AgentEvent::StateChange { state: new_state });
    }

    async fn run_conversation(&self) -> Result<()> {
        let max_turns = self.session.config().max_turns;

        for turn in 0..max_turns {
            self.ensure_not_interrupted()?;

            let messages = self.history.lock().unwrap().messages();
            let tools = self.registry.lock().unwrap().definitions().to_vec();

            let stream = self.request_stream(&messages, &tools).await?;
            let turn_state = self.consume_stream(stream).await?;

            self.append_assistant_message(&turn_state);
            self.session.add_usage(&turn_state.usage);
            self.bus.emit(&AgentEvent::token_usage(turn_state.usage));

            if !turn_state.needs_tool_execution() {
                return Ok(());
            }

            self.run_tool_round(turn_state.tool_uses).await;
            tracing::debug!(turn, "tool round complete, continuing loop");
        }

        tracing::debug!(max_turns, "turn cap reached, ending submission");
        Ok(())
    }

    fn ensure_not_interrupted(&self) -> Result<()> {
        if self.interrupt.is_interrupted() {
            return Err(InterruptedError.into());
        }
        Ok(())
    }

    async fn request_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelStream> {
        tokio::select! {
            biased;
            () = self.interrupt.wait() => Err(InterruptedError.into()),
            result = self.client.stream_message(messages, tools) => result,
        }
    }

    async fn consume_stream(&self, mut stream: ModelStream) -> Result<TurnState> {
        let mut state = TurnState::default();

        loop {
            self.ensure_not_interrupted()?;
            let event = match timeout(STREAM_POLL_TIMEOUT, stream.next()).await {
                Ok(Some(result)) => result.map_err(anyhow::Error::new)?,
                Ok(None) => return Ok(state),
                Err(_) => continue,
            };
            self.handle_stream_event(event, &mut state)?;
        }
    }

    fn handle_stream_event(&self, event: StreamEvent, state: &mut TurnState) -> Result<()> {
        match event {
            StreamEvent::TextDelta { text, .. } if !text.is_empty() => {
                state.text.push_str(&text);
                self.bus.emit(&AgentEvent::TextDelta { text });
            }
            StreamEvent::ContentBlockStart {
                index,
                block_type: ContentBlockType::ToolUse,
                id,
                name,
            } => {
                state.tool_uses.push(ToolUseBuilder {
                    index,
                    id: id.unwrap_or_default(),
                    name: name.unwrap_or_default(),
                    input_json: String::new(),
                    finalized: None,
                });
            }
            StreamEvent::InputJsonDelta {
                index,
                partial_json,
            } => {
                if let Some(tu) = state.find_tool_use_mut(index) {
                    tu.input_json.push_str(&partial_json);
                }
            }
            // A closed tool_use block is a complete invocation request:
            // announce it now, before any execution.
            StreamEvent::ContentBlockStop { index } => {
                if let Some(tu) = state.find_tool_use_mut(index)
                    && tu.finalized.is_none()
                {
                    let parsed = tu.parse_input();
                    tu.finalized = Some(parsed);
                    self.bus.emit(&AgentEvent::ToolStart {
                        tool_id: tu.id.clone(),
                        tool_name: tu.name.clone(),
                        input: tu.input_value(),
                    });
                }
            }
            StreamEvent::MessageStart { usage } => {
                state.usage.input_tokens = usage.input_tokens;
            }
            StreamEvent::MessageDelta { stop_reason, usage } => {
                if let Some(reason) = stop_reason {
                    state.stop_reason = Some(StopReason::parse(&reason));
                }
                if let Some(usage) = usage {
                    state.usage.output_tokens = usage.output_tokens;
                }
            }
            StreamEvent::Error {
                error_type,
                message,
            } => {
                return Err(ProviderError::api_error(&error_type, &message).into());
            }
            _ => {}
        }
        Ok(())
    }

    /// Appends the turn's assistant message: accumulated text first,
    /// then the tool_use blocks in emission order.
    fn append_assistant_message(&self, turn: &TurnState) {
        let mut blocks = Vec::with_capacity(1 + turn.tool_uses.len());
        if !turn.text.is_empty() {
            blocks.push(ContentBlock::Text {
                text: turn.text.clone(),
            });
        }
        for tu in &turn.tool_uses {
            blocks.push(ContentBlock::ToolUse {
                id: tu.id.clone(),
                name: tu.name.clone(),
                input: tu.input_value(),
            });
        }
        if !blocks.is_empty() {
            self.history.lock().unwrap().add_assistant_message(blocks);
        }
    }

    /// Executes the turn's tool invocations sequentially, in emission
    /// order, and appends all results as one user message.
    ///
    /// A failing tool never aborts the round: the failure becomes an
    /// `is_error` result the model can react to.
    async fn run_tool_round(&self, tool_uses: Vec<ToolUseBuilder>) {
        let mut results = Vec::with_capacity(tool_uses.len());
        let mut seen_ids: HashSet<String> = HashSet::new();

        for tu in tool_uses {
            let outcome = self.dispatch_tool(&tu, &mut seen_ids).await;

            let (content, is_error) = match outcome {
                Ok(output) => {
                    self.bus.emit(&AgentEvent::ToolEnd {
                        tool_id: tu.id.clone(),
                        result: Some(output.clone()),
                        error: None,
                    });
                    (output, false)
                }
                Err(message) => {
                    self.bus.emit(&AgentEvent::ToolEnd {
                        tool_id: tu.id.clone(),
                        result: None,
                        error: Some(message.clone()),
                    });
                    (message, true)
                }
            };

            results.push(ContentBlock::ToolResult {
                tool_use_id: tu.id.clone(),
                content,
                is_error,
            });
        }

        self.history.lock().unwrap().add_tool_results(results);
    }

    async fn dispatch_tool(
        &self,
        tu: &ToolUseBuilder,
        seen_ids: &mut HashSet<String>,
    ) -> Result<String, String> {
        // Blocks normally finalize at content_block_stop; a truncated
        // stream can leave one open, so parse lazily as a fallback.
        let input = match tu.finalized.clone().unwrap_or_else(|| tu.parse_input()) {
            Ok(input) => input,
            Err(message) => return Err(message),
        };

        if !seen_ids.insert(tu.id.clone()) {
            return Err(format!("duplicate tool invocation id: {}", tu.id));
        }

        // Clone out of the lock so the handler can run across awaits.
        let registry = self.registry.lock().unwrap().clone();
        registry
            .execute(&tu.name, &input, &self.tool_ctx)
            .await
            .map_err(|err| format!("{err:#}"))
    }
}

fn classify_error(err: &anyhow::Error) -> AgentError {
    if let Some(provider_err) = err.downcast_ref::<ProviderError>() {
        let mut error = AgentError::new(ErrorCode::ApiError, provider_err.message.clone());
        if let Some(details) = &provider_err.details {
            error = error.with_details(details.clone());
        }
        error
    } else {
        AgentError::new(ErrorCode::Unknown, format!("{err:#}"))
    }
}
