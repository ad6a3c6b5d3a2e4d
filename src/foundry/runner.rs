// src/foundry/runner.rs
// Safe execution of a single tool invocation: path sandboxing, diff
// snapshots, the action call, result classification and UI broadcasts.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use super::{Foundry, Invocation, ToolContext, ToolSpec};
use crate::api::ws::message::{
    FileContentPayload, FilePathPayload, ServerMessage,
};
use crate::workspace::project::file_tree;
use crate::workspace::sandbox::resolve_in_project;

/// Path-shaped parameters resolved through the sandbox before execution.
const PATH_PARAM_KEYS: &[&str] = &["path", "source_path", "destination_path", "requirements_path"];

pub struct ToolRunner {
    foundry: Arc<Foundry>,
}

impl ToolRunner {
    pub fn new(foundry: Arc<Foundry>) -> Self {
        Self { foundry }
    }

    /// Executes one invocation and returns the raw tool result. Failures are
    /// values too; use [`failure_message`] to classify.
    pub async fn run(&self, ctx: &ToolContext, invocation: &Invocation) -> Value {
        let Some(spec) = self.foundry.get(&invocation.tool_name) else {
            let message = format!("Error: tool '{}' not found in the foundry.", invocation.tool_name);
            error!("{}", message);
            return Value::String(message);
        };

        let mut args = invocation.arguments.clone();
        if !args.is_object() {
            args = Value::Object(serde_json::Map::new());
        }
        if let Err(message) = self.resolve_path_params(ctx, spec, &mut args) {
            warn!("{}", message);
            return Value::String(message);
        }

        info!("Executing tool: {}", spec.id);

        if spec.id == "write_file" {
            if let Some(path) = args.get("path").and_then(Value::as_str) {
                ctx.hub
                    .broadcast_to_user(
                        &ServerMessage::FileWritingPending {
                            content: FilePathPayload {
                                file_path: ctx.relative(Path::new(path)),
                            },
                        },
                        ctx.user_id,
                    )
                    .await;
            }
        }

        tokio::time::sleep(Duration::from_millis(100)).await;

        let write_file_path = args.get("path").and_then(Value::as_str).map(str::to_string);
        let result = match spec.action.invoke(ctx, args).await {
            Ok(result) => result,
            Err(e) => {
                error!("Tool '{}' raised an error: {:#}", spec.id, e);
                Value::String(format!("Error executing tool '{}': {}", spec.id, e))
            }
        };

        if failure_message(&result).is_none() {
            self.broadcast_mutation_updates(ctx, spec, write_file_path.as_deref()).await;
        }

        result
    }

    /// Resolve path parameters to absolute, sandboxed paths and snapshot the
    /// originals of files a mutating tool is about to touch.
    fn resolve_path_params(
        &self,
        ctx: &ToolContext,
        spec: &ToolSpec,
        args: &mut Value,
    ) -> Result<(), String> {
        let Some(map) = args.as_object_mut() else {
            return Ok(());
        };
        for key in PATH_PARAM_KEYS {
            let Some(raw) = map.get(*key).and_then(Value::as_str) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            let resolved = resolve_in_project(ctx.project_root(), raw)
                .map_err(|e| format!("Error: {}", e))?;
            if spec.mutating {
                ctx.snapshot_for_diff(&resolved);
            }
            map.insert(
                key.to_string(),
                Value::String(resolved.to_string_lossy().to_string()),
            );
        }
        Ok(())
    }

    async fn broadcast_mutation_updates(
        &self,
        ctx: &ToolContext,
        spec: &ToolSpec,
        write_file_path: Option<&str>,
    ) {
        if !spec.filesystem {
            return;
        }
        ctx.hub
            .broadcast_to_user(
                &ServerMessage::FileTreeUpdated {
                    content: file_tree(ctx.project_root()),
                },
                ctx.user_id,
            )
            .await;

        if spec.id == "write_file" {
            if let Some(path) = write_file_path {
                match std::fs::read_to_string(path) {
                    Ok(content) => {
                        ctx.hub
                            .broadcast_to_user(
                                &ServerMessage::FileContentUpdated {
                                    content: FileContentPayload {
                                        file_path: ctx.relative(Path::new(path)),
                                        content,
                                    },
                                },
                                ctx.user_id,
                            )
                            .await;
                    }
                    Err(e) => {
                        error!("Could not read file content after write to send to UI: {}", e);
                    }
                }
            }
        }
    }
}

/// Classifies a tool result. Returns the failure message when the result
/// indicates an error: strings beginning with "Error" or containing
/// "failed", and objects with `status` of "failure"/"error".
pub fn failure_message(result: &Value) -> Option<String> {
    match result {
        Value::Null => Some(
            "Tool returned an empty result, which indicates a potential failure.".to_string(),
        ),
        Value::String(text) => {
            let lowered = text.trim().to_lowercase();
            if lowered.starts_with("error") || lowered.contains("failed") {
                Some(text.clone())
            } else {
                None
            }
        }
        Value::Object(map) => {
            let status = map.get("status").and_then(Value::as_str).unwrap_or("success");
            if matches!(status.to_lowercase().as_str(), "failure" | "error") {
                let detail = map
                    .get("summary")
                    .or_else(|| map.get("full_output"))
                    .and_then(Value::as_str)
                    .unwrap_or("Tool indicated failure without a detailed message.");
                Some(detail.to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_error_strings_and_status_objects() {
        assert!(failure_message(&Value::Null).is_some());
        assert!(failure_message(&json!("Error: file not found")).is_some());
        assert!(failure_message(&json!("error: lowercase still counts")).is_some());
        assert!(failure_message(&json!("One or more tests failed.")).is_some());
        assert!(failure_message(&json!("Successfully wrote 42 bytes")).is_none());

        assert!(failure_message(&json!({"status": "failure", "summary": "boom"}))
            .is_some_and(|m| m == "boom"));
        assert!(failure_message(&json!({"status": "error"})).is_some());
        assert!(failure_message(&json!({"status": "success"})).is_none());
        assert!(failure_message(&json!({"result": "ok"})).is_none());
    }
}
