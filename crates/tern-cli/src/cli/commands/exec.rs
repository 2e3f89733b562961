//! Exec command handler.

use std::path::Path;

use anyhow::Result;
use tern_core::config::Config;
use tern_core::core::events::AgentState;
use tern_core::core::interrupt::InterruptedError;

use crate::render::Renderer;

/// Runs a single submission and streams the reply to stdout.
pub async fn run(root: &str, prompt: &str, config: &Config) -> Result<()> {
    let orchestrator = super::build_orchestrator(config, Path::new(root))?;
    super::install_ctrl_c(&orchestrator)?;

    let renderer = Renderer::attach(orchestrator.bus());

    orchestrator.submit(prompt).await;
    renderer.finish();

    if orchestrator.interrupt_token().is_interrupted() {
        return Err(InterruptedError.into());
    }
    if orchestrator.state() == AgentState::Error {
        // The renderer already printed the error event to stderr.
        anyhow::bail!("submission failed");
    }
    Ok(())
}
