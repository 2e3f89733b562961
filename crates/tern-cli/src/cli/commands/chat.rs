//! Chat command handler.

use std::io::{IsTerminal, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tern_core::config::Config;

use crate::render::Renderer;

/// Interactive loop: read a line, submit it, stream the reply, repeat.
///
/// Piped stdin degrades to a single exec-style submission so
/// `echo "..." | tern` works.
pub async fn run(root: &str, config: &Config) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        let mut prompt = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut prompt)
            .context("read piped stdin")?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            anyhow::bail!("No input provided via pipe");
        }
        return super::exec::run(root, prompt, config).await;
    }

    let orchestrator = super::build_orchestrator(config, Path::new(root))?;
    super::install_ctrl_c(&orchestrator)?;

    let renderer = Renderer::attach(orchestrator.bus());

    let info = orchestrator.session_info();
    println!("tern chat ({})", info.model);
    println!("Type a message, /clear to reset history, /quit to exit.");

    loop {
        print!("> ");
        std::io::stdout().flush().context("flush prompt")?;

        let Some(line) = read_line().await? else {
            break; // EOF
        };
        let line = line.trim().to_string();

        match line.as_str() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                orchestrator.clear_history();
                println!("History cleared.");
                continue;
            }
            _ => {}
        }

        orchestrator.submit(&line).await;
        renderer.finish();
    }

    Ok(())
}

/// Blocking stdin read off the async runtime. `None` means EOF.
async fn read_line() -> Result<Option<String>> {
    let result = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|n| (n, line))
    })
    .await
    .context("stdin reader task")?;

    let (n, line) = result.context("read stdin")?;
    if n == 0 { Ok(None) } else { Ok(Some(line)) }
}
