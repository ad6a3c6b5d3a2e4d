// src/foundry/actions/mission_log.rs
// Actions that let the agent read and extend its own to-do list.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use super::{ok, parse_args};
use crate::foundry::ToolContext;

#[derive(Deserialize)]
struct AddTaskArgs {
    description: String,
    #[serde(default)]
    tool_call: Option<Value>,
}

pub async fn add_task_to_mission_log(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddTaskArgs = parse_args("add_task_to_mission_log", args)?;
    let mut log = ctx.mission_log.lock().await;
    match log.add_task(&args.description, args.tool_call).await {
        Ok(task) => ok(format!(
            "Successfully added task {}: '{}' to the Agent TODO list.",
            task.id, args.description
        )),
        Err(e) => ok(format!("Error: Could not add task. {}", e)),
    }
}

#[derive(Deserialize)]
struct MarkDoneArgs {
    task_id: i64,
}

pub async fn mark_task_as_done(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: MarkDoneArgs = parse_args("mark_task_as_done", args)?;
    let mut log = ctx.mission_log.lock().await;
    if log.mark_done(args.task_id).await {
        ok(format!("Successfully marked task {} as done.", args.task_id))
    } else {
        ok(format!("Error: Could not find task with ID {}.", args.task_id))
    }
}

pub async fn get_mission_log(ctx: &ToolContext, _args: Value) -> Result<Value> {
    let log = ctx.mission_log.lock().await;
    let tasks = log.tasks();
    if tasks.is_empty() {
        return ok("The Agent TODO list is currently empty.");
    }

    let mut lines = vec!["Current Agent TODO:".to_string()];
    for task in tasks {
        let status = if task.done { "[x]" } else { "[ ]" };
        lines.push(format!("- {} ID {}: {}", status, task.id, task.description));
    }
    ok(lines.join("\n"))
}
