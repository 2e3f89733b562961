//! Tool for executing shell commands.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};

use super::ToolContext;
use crate::message::ToolDefinition;

/// Maximum bytes per output stream (stdout/stderr) before truncation.
const MAX_OUTPUT_BYTES: usize = 40 * 1024;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "run_shell".to_string(),
        description: "Execute a shell command and return its output. Stderr, when non-empty, \
            is appended after the stdout."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct RunShellInput {
    command: String,
}

pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<String> {
    let input: RunShellInput = serde_json::from_value(input.clone())
        .context("Invalid input for run_shell tool")?;

    if input.command.trim().is_empty() {
        bail!("command cannot be empty");
    }

    let child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&input.command)
        .current_dir(&ctx.root)
        // Signal to programs that we are a non-interactive, dumb terminal.
        // This suppresses ANSI escapes and progress bars in most CLI tools.
        .env("TERM", "dumb")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to execute command '{}'", input.command))?;

    let output_fut = child.wait_with_output();
    let output = match ctx.timeout {
        Some(timeout) => match tokio::time::timeout(timeout, output_fut).await {
            Ok(result) => result,
            Err(_) => bail!("Command timed out after {} seconds", timeout.as_secs()),
        },
        None => output_fut.await,
    }
    .with_context(|| format!("Failed to execute command '{}'", input.command))?;

    let stdout = truncate_at_utf8_boundary(&output.stdout, MAX_OUTPUT_BYTES);
    let stderr = truncate_at_utf8_boundary(&output.stderr, MAX_OUTPUT_BYTES);

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        bail!("Command exited with code {code}: {stderr}");
    }

    if stderr.is_empty() {
        Ok(stdout)
    } else {
        Ok(format!("{stdout}\nSTDERR: {stderr}"))
    }
}

/// Truncates a byte slice at a valid UTF-8 character boundary.
fn truncate_at_utf8_boundary(bytes: &[u8], max_bytes: usize) -> String {
    if bytes.len() <= max_bytes {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    // Walk backwards past UTF-8 continuation bytes (10xxxxxx).
    let mut end = max_bytes;
    while end > 0 && (bytes[end - 1] & 0xC0) == 0x80 {
        end -= 1;
    }
    // If we landed on the start of a multi-byte sequence that would
    // extend past the cut, drop it too.
    if end > 0 && bytes[end - 1] >= 0xC0 {
        end -= 1;
    }

    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
