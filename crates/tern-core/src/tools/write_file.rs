//! Tool for writing file contents.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, resolve_path};
use crate::message::ToolDefinition;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "write_file".to_string(),
        description: "Write content to a file at the given path, creating parent directories as \
            needed. Overwrites any existing content."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct WriteFileInput {
    path: String,
    content: String,
}

pub async fn execute(input: &Value, ctx: &ToolContext) -> Result<String> {
    let input: WriteFileInput = serde_json::from_value(input.clone())
        .context("Invalid input for write_file tool")?;

    if input.path.trim().is_empty() {
        bail!("path cannot be empty");
    }

    let path = resolve_path(&input.path, &ctx.root);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    tokio::fs::write(&path, &input.content)
        .await
        .with_context(|| format!("Failed to write file '{}'", path.display()))?;

    Ok(format!("Successfully wrote to {}", input.path))
}
