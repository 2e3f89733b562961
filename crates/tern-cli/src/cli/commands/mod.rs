//! Command handlers.

pub mod chat;
pub mod config;
pub mod exec;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tern_core::config::Config;
use tern_core::core::orchestrator::Orchestrator;
use tern_core::core::session::AgentConfig;
use tern_core::providers::anthropic::{AnthropicClient, AnthropicConfig};

/// Wires config, provider client, and orchestrator together.
pub fn build_orchestrator(config: &Config, root: &Path) -> Result<Arc<Orchestrator>> {
    let anthropic = &config.providers.anthropic;
    let provider_config = AnthropicConfig::from_env(
        config.model.clone(),
        config.max_tokens,
        config.system_prompt.clone(),
        anthropic.effective_base_url(),
        anthropic.effective_api_key(),
    )
    .context("configure Anthropic client")?;
    let client = AnthropicClient::new(provider_config);

    let agent_config = AgentConfig {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        system_prompt: config.system_prompt.clone(),
        max_turns: config.max_turns,
        max_history_messages: config.max_history_messages,
        tool_timeout: config.tool_timeout(),
    };

    Ok(Arc::new(Orchestrator::new(
        agent_config,
        resolve_root(root)?,
        Arc::new(client),
    )))
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    if root.is_dir() {
        root.canonicalize()
            .with_context(|| format!("resolve root directory {}", root.display()))
    } else {
        anyhow::bail!("root is not a directory: {}", root.display())
    }
}

/// Routes Ctrl+C to the orchestrator; a second Ctrl+C while the first
/// is still pending force-exits.
pub fn install_ctrl_c(orchestrator: &Orchestrator) -> Result<()> {
    let token = orchestrator.interrupt_token();
    ctrlc::set_handler(move || {
        if token.is_interrupted() {
            std::process::exit(130);
        }
        token.trigger();
    })
    .context("set Ctrl+C handler")
}
