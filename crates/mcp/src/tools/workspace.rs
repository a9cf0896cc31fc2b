// File writing for pattern sources supplied inline by the host

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Tool writing caller-supplied content to a file, creating parent
/// directories as needed.
pub struct WriteFileTool;

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    file_path: String,
    content: String,
}

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "write_file".to_string(),
            description: "Write content to a file, creating parent directories if needed."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "file_path": json_schema_string("Path where the file should be saved"),
                    "content": json_schema_string("Content to write to the file")
                }),
                vec!["file_path", "content"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: WriteFileArgs =
            serde_json::from_value(arguments).context("Invalid arguments for write_file")?;

        let path = PathBuf::from(&args.file_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return Ok(CallToolResult::failure(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        e
                    )));
                }
            }
        }

        if let Err(e) = tokio::fs::write(&path, &args.content).await {
            return Ok(CallToolResult::failure(format!(
                "failed to write {}: {}",
                path.display(),
                e
            )));
        }

        let resolved = path.canonicalize().unwrap_or(path);
        let report = serde_json::json!({
            "success": true,
            "file_path": resolved.display().to_string(),
        });
        let text = serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string());
        Ok(CallToolResult::text(text))
    }
}
