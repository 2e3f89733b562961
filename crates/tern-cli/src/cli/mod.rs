//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use tern_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tern")]
#[command(version)]
#[command(about = "Streaming LLM agent for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Root directory for file operations (default: current directory)
    #[arg(long, default_value = ".")]
    root: String,

    /// Override the model from config
    #[arg(long)]
    model: Option<String>,

    /// Override the system prompt from config
    #[arg(long)]
    system_prompt: Option<String>,

    /// Override the per-submission turn cap from config
    #[arg(long)]
    max_turns: Option<u32>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Send one prompt and stream the response
    Exec {
        /// The prompt to send to the agent
        #[arg(short, long)]
        prompt: String,
    },

    /// Interactive chat (read a line, stream the reply, repeat)
    Chat,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Log filter comes from `TERN_LOG`, falling back to `RUST_LOG`, then
/// warnings only. Output goes to stderr so streamed text stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("TERN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = Config::load().context("load config")?;

    if let Some(model) = cli.model.as_deref() {
        config.model = model.to_string();
    }
    if let Some(sp) = cli.system_prompt.as_deref() {
        let trimmed = sp.trim();
        config.system_prompt = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
    if let Some(max_turns) = cli.max_turns {
        config.max_turns = max_turns;
    }
    tracing::debug!(model = %config.model, max_turns = config.max_turns, "config resolved");

    match cli.command {
        // default to chat mode
        None | Some(Commands::Chat) => commands::chat::run(&cli.root, &config).await,
        Some(Commands::Exec { prompt }) => commands::exec::run(&cli.root, &prompt, &config).await,
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
