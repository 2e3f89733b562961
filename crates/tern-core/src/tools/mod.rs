//! Tool system for agentic capabilities.
//!
//! A registry of named tools the orchestrator can dispatch to, plus
//! the builtin file and shell tools.

pub mod read_file;
pub mod run_shell;
pub mod write_file;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use serde_json::Value;

use crate::message::ToolDefinition;

/// Resolves a tool path argument against the context root.
///
/// Absolute paths are used as-is; relative paths are joined with root.
pub(crate) fn resolve_path(path: &str, root: &Path) -> PathBuf {
    let requested = Path::new(path);
    if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    }
}

/// Context for tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Root directory for file operations and shell commands.
    pub root: PathBuf,

    /// Optional timeout for tool execution.
    pub timeout: Option<Duration>,
}

impl ToolContext {
    #[must_use]
    pub fn new(root: PathBuf, timeout: Option<Duration>) -> Self {
        Self { root, timeout }
    }
}

/// Async tool handler function.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;
pub type ToolHandler = Arc<dyn Fn(&Value, &ToolContext) -> ToolFuture + Send + Sync>;

/// Tool registry (definitions + executors).
#[derive(Clone, Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, ToolHandler>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("definitions", &self.definitions)
            .field("handlers_len", &self.handlers.len())
            .finish()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// A registry pre-loaded with the builtin tools.
    #[must_use]
    pub fn builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_tools();
        registry
    }

    /// Registers a tool, replacing any existing tool of the same name.
    ///
    /// Re-registration keeps the original position so `definitions()`
    /// order stays stable.
    pub fn register(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        let name = definition.name.clone();
        if let Some(existing) = self
            .definitions
            .iter_mut()
            .find(|t| t.name == definition.name)
        {
            *existing = definition;
        } else {
            self.definitions.push(definition);
        }
        self.handlers.insert(name, handler);
    }

    /// Definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Executes the named tool.
    ///
    /// # Errors
    /// Errors when the tool is not registered or its executor fails.
    pub async fn execute(&self, name: &str, input: &Value, ctx: &ToolContext) -> Result<String> {
        let Some(handler) = self.handlers.get(name) else {
            bail!("tool not found: {name}");
        };
        tracing::debug!(tool = name, "executing tool");
        handler(input, ctx).await
    }

    fn register_builtin_tools(&mut self) {
        self.register(
            read_file::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { read_file::execute(&input, &ctx).await })
            }),
        );

        self.register(
            write_file::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { write_file::execute(&input, &ctx).await })
            }),
        );

        self.register(
            run_shell::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { run_shell::execute(&input, &ctx).await })
            }),
        );
    }
}
