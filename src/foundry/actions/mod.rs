// src/foundry/actions/mod.rs
// Tool actions, organized by domain. Actions return their result as a JSON
// value; error strings are results too and are classified by the runner.

pub mod code_edit;
pub mod code_intel;
pub mod deps;
pub mod file_ops;
pub mod mission_log;
pub mod rag;
pub mod shell;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize the LLM-supplied arguments into the action's typed view,
/// enforcing the declared parameter shape.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| anyhow!("invalid arguments for {}: {}", tool, e))
}

pub(crate) fn ok(message: impl Into<String>) -> Result<Value> {
    Ok(Value::String(message.into()))
}
