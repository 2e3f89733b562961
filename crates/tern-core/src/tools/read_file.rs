//! Tool for reading UTF-8 file contents.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, resolve_path};
use crate::message::ToolDefinition;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "read_file".to_string(),
        description: "Read the contents of a file at the given path.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path of the file to read"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ReadFileInput {
    path: String,
}

pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<String> {
    let input: ReadFileInput = serde_json::from_value(input.clone())
        .context("Invalid input for read_file tool")?;

    if input.path.trim().is_empty() {
        bail!("path cannot be empty");
    }

    let path = resolve_path(&input.path, &ctx.root);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read file '{}'", path.display()))
}
