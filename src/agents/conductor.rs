// src/agents/conductor.rs
// The mission conductor: drives an approved plan task by task, with per-task
// retry, strategic re-planning after repeated failure, and a final polish
// pass before declaring success.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lazy_static::lazy_static;
use parking_lot::{Mutex as SyncMutex, RwLock};
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::team::{file_manifest, format_mission_log, DevelopmentTeam, Speaker};
use crate::api::ws::hub::BroadcastHub;
use crate::api::ws::message::{ActiveTaskPayload, AgentStatus, ServerMessage};
use crate::foundry::{Foundry, Invocation, ToolContext, ToolRunner};
use crate::index::{SymbolIndex, VectorIndex};
use crate::llm::roles::ROLE_CODER;
use crate::mission::{DiffTracker, MissionControl, MissionLogStore, Task};
use crate::pycode;
use crate::workspace::project::{read_file, write_file, ProjectContext};

const MAX_RETRIES_PER_TASK: u32 = 1;
const TASK_PAUSE: Duration = Duration::from_millis(500);
const RAW_EXCERPT_BYTES: usize = 1000;

lazy_static! {
    static ref PATH_TOKEN_RE: Regex = Regex::new(r"([A-Za-z0-9_./-]+\.[A-Za-z0-9]+)").unwrap();
}

pub struct Conductor {
    user_id: i64,
    project: ProjectContext,
    mission_log: Arc<Mutex<MissionLogStore>>,
    vector: Arc<VectorIndex>,
    symbols: Arc<RwLock<SymbolIndex>>,
    team: Arc<DevelopmentTeam>,
    foundry: Arc<Foundry>,
    runner: ToolRunner,
    hub: Arc<BroadcastHub>,
    control: Arc<MissionControl>,
    diff: Arc<SyncMutex<DiffTracker>>,
}

impl Conductor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: i64,
        project: ProjectContext,
        mission_log: Arc<Mutex<MissionLogStore>>,
        vector: Arc<VectorIndex>,
        symbols: Arc<RwLock<SymbolIndex>>,
        team: Arc<DevelopmentTeam>,
        foundry: Arc<Foundry>,
        hub: Arc<BroadcastHub>,
        control: Arc<MissionControl>,
    ) -> Self {
        let runner = ToolRunner::new(foundry.clone());
        Self {
            user_id,
            project,
            mission_log,
            vector,
            symbols,
            team,
            foundry,
            runner,
            hub,
            control,
            diff: Arc::new(SyncMutex::new(DiffTracker::new())),
        }
    }

    /// Runs the mission to completion, owning the lifecycle flags: the
    /// running flag is set on entry and cleared - with an `agent_status:
    /// idle` broadcast - no matter how the mission ends.
    pub async fn execute_mission_in_background(self) {
        self.control.set_mission_running(self.user_id);
        let goal = self.mission_log.lock().await.initial_goal().to_string();

        if let Err(e) = self.execute_mission(&goal).await {
            error!("Critical error during mission for user {}: {:#}", self.user_id, e);
            self.team
                .post_chat_message(
                    Speaker::Aura,
                    &format!("A critical error stopped the mission: {}", e),
                    true,
                )
                .await;
            self.hub
                .broadcast_to_user(
                    &ServerMessage::MissionFailure {
                        content: e.to_string(),
                    },
                    self.user_id,
                )
                .await;
        }

        self.control.set_mission_finished(self.user_id);
        self.hub
            .broadcast_to_user(
                &ServerMessage::AgentStatus {
                    status: AgentStatus::Idle,
                },
                self.user_id,
            )
            .await;
        info!("Conductor finished mission for user {}.", self.user_id);
    }

    async fn execute_mission(&self, goal: &str) -> Result<()> {
        self.team
            .post_chat_message(
                Speaker::Conductor,
                "Mission dispatched. Beginning autonomous execution.",
                false,
            )
            .await;
        self.hub
            .broadcast_to_user(
                &ServerMessage::AgentStatus {
                    status: AgentStatus::Thinking,
                },
                self.user_id,
            )
            .await;

        loop {
            if !self.control.is_running(self.user_id) {
                info!("Mission for user {} was stopped by request.", self.user_id);
                self.team
                    .post_chat_message(Speaker::Conductor, "Mission execution halted by user.", false)
                    .await;
                break;
            }

            let Some(mut current_task) = self.mission_log.lock().await.pending_tasks().first().cloned()
            else {
                self.run_final_polish_check(goal).await;
                self.handle_mission_completion().await;
                break;
            };

            self.hub
                .broadcast_to_user(
                    &ServerMessage::ActiveTaskUpdated {
                        content: ActiveTaskPayload {
                            task_id: current_task.id,
                        },
                    },
                    self.user_id,
                )
                .await;

            let mut retry_count = 0u32;
            let mut task_succeeded = false;
            while retry_count <= MAX_RETRIES_PER_TASK {
                if !self.control.is_running(self.user_id) {
                    break;
                }
                info!("Executing task {}: {}", current_task.id, current_task.description);

                let Some(invocation) = self.tool_call_for_task(&current_task).await else {
                    let message = format!(
                        "Could not determine a tool call for task: '{}'",
                        current_task.description
                    );
                    self.record_task_error(&mut current_task, &message).await;
                    retry_count += 1;
                    continue;
                };

                let ctx = self.tool_context(goal, current_task.id);
                let result = self.runner.run(&ctx, &invocation).await;

                match crate::foundry::runner::failure_message(&result) {
                    None => {
                        self.mission_log.lock().await.mark_done(current_task.id).await;
                        self.team
                            .post_chat_message(
                                Speaker::Conductor,
                                &format!("Task completed: {}", current_task.description),
                                false,
                            )
                            .await;
                        task_succeeded = true;
                        break;
                    }
                    Some(message) => {
                        warn!("Task {} failed. Error: {}", current_task.id, message);
                        self.record_task_error(&mut current_task, &message).await;
                        retry_count += 1;
                        self.team
                            .post_chat_message(
                                Speaker::Conductor,
                                &format!("Task failed, retrying. Error: {}", message),
                                true,
                            )
                            .await;
                    }
                }
            }

            if !task_succeeded && self.control.is_running(self.user_id) {
                error!("Task {} failed after retries. Re-planning.", current_task.id);
                self.team
                    .post_chat_message(Speaker::Aura, "I'm stuck. Rethinking my approach.", true)
                    .await;
                self.team
                    .run_strategic_replan(
                        goal,
                        current_task.id,
                        &current_task.description,
                        current_task.last_error.as_deref(),
                    )
                    .await?;
            } else {
                tokio::time::sleep(TASK_PAUSE).await;
            }
        }

        Ok(())
    }

    async fn record_task_error(&self, task: &mut Task, message: &str) {
        task.last_error = Some(message.to_string());
        self.mission_log.lock().await.set_last_error(task.id, message);
    }

    fn tool_context(&self, goal: &str, task_id: i64) -> ToolContext {
        ToolContext {
            user_id: self.user_id,
            user_goal: goal.to_string(),
            current_task_id: Some(task_id),
            project: self.project.clone(),
            mission_log: self.mission_log.clone(),
            vector: self.vector.clone(),
            symbols: self.symbols.clone(),
            team: self.team.clone(),
            hub: self.hub.clone(),
            diff: self.diff.clone(),
        }
    }

    // =====================================================================
    // Tool selection
    // =====================================================================

    /// Asks the coder model for the single tool call that advances the given
    /// task, against the full context bundle.
    async fn tool_call_for_task(&self, task: &Task) -> Option<Invocation> {
        let mut task_description = task.description.clone();
        if let Some(last_error) = &task.last_error {
            task_description.push_str(&format!(
                "\n\n**PREVIOUS ATTEMPT FAILED!** Last error: `{}`. You MUST try a different approach.",
                last_error
            ));
        }

        let mission_log = format_mission_log(&self.mission_log.lock().await.tasks());
        let active_file_context = self.active_file_context(&task_description);
        let vector_context = self.vector_context(&task.description).await;
        let file_structure = file_manifest(&self.project.project_root);
        let available_tools =
            serde_json::to_string_pretty(&self.foundry.tool_definitions()).unwrap_or_default();

        let prompt = super::prompts::render(
            super::prompts::CODER_PROMPT,
            &[
                ("current_task", &task_description),
                ("mission_log", &mission_log),
                ("file_structure", &file_structure),
                ("active_file_context", &active_file_context),
                ("relevant_code_snippets", &vector_context),
                ("available_tools", &available_tools),
                ("json_output_rule", super::prompts::JSON_OUTPUT_RULE),
            ],
        );

        let response = match self.team.invoke_role_json(ROLE_CODER, prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!("Conductor's LLM call failed. Details: {}", e);
                return None;
            }
        };

        let parsed = match self.team.parse_json_response(&response) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Conductor failed to parse LLM tool call response: {}", e);
                return None;
            }
        };

        // Accept either a bare invocation or one nested under `tool_call`.
        let invocation_value = match parsed.get("tool_call") {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => parsed,
        };
        match serde_json::from_value::<Invocation>(invocation_value) {
            Ok(invocation) if !invocation.tool_name.is_empty() => Some(invocation),
            _ => {
                error!("Response did not contain 'tool_name' and 'arguments'. Raw: {}", response);
                None
            }
        }
    }

    /// The Active File Context: capability summaries for every file-looking
    /// token in the task description.
    fn active_file_context(&self, task_description: &str) -> String {
        let mut found: Vec<String> = PATH_TOKEN_RE
            .find_iter(task_description)
            .map(|m| m.as_str().to_string())
            .collect();
        found.sort();
        found.dedup();

        let mut sections = Vec::new();
        for token in found {
            // Bare words with a short extension-like suffix are usually not
            // files (e.g. "e.g" or version numbers); keep known extensions.
            if !token.contains('/')
                && !token.ends_with(".py")
                && !token.ends_with(".md")
                && !token.ends_with(".txt")
                && !token.ends_with(".json")
                && !token.ends_with(".toml")
            {
                continue;
            }

            let header = format!("**Context for `{}`:**", token);
            match read_file(&self.project.project_root, &token) {
                Ok(Some(content)) => {
                    if token.ends_with(".py") {
                        match pycode::summarize(&content) {
                            Ok(summary) => {
                                let mut parts = vec![header];
                                if !summary.imports.is_empty() {
                                    parts.push(format!(
                                        "- Imports: {}",
                                        summary.imports.iter().cloned().collect::<Vec<_>>().join(", ")
                                    ));
                                }
                                if !summary.functions.is_empty() {
                                    parts.push(format!(
                                        "- Functions: {}",
                                        summary.functions.iter().cloned().collect::<Vec<_>>().join(", ")
                                    ));
                                }
                                if !summary.classes.is_empty() {
                                    parts.push(format!(
                                        "- Classes: {}",
                                        summary.classes.iter().cloned().collect::<Vec<_>>().join(", ")
                                    ));
                                }
                                if summary.is_empty() {
                                    parts.push(
                                        "- The file is valid Python but contains no top-level definitions."
                                            .to_string(),
                                    );
                                }
                                sections.push(parts.join("\n"));
                            }
                            Err(_) => {
                                sections.push(format!(
                                    "{}\n```\n{}...\n```",
                                    header,
                                    excerpt(&content)
                                ));
                            }
                        }
                    } else {
                        sections.push(format!("{}\n```\n{}...\n```", header, excerpt(&content)));
                    }
                }
                _ => {
                    sections.push(format!(
                        "{}\n- This file does not exist yet. You may need to create it.",
                        header
                    ));
                }
            }
        }

        if sections.is_empty() {
            "No specific file context was identified for this task. You might be creating a new file or directory."
                .to_string()
        } else {
            sections.join("\n\n")
        }
    }

    async fn vector_context(&self, task_description: &str) -> String {
        if self.vector.count().await == 0 {
            return "Vector context (RAG) is currently empty.".to_string();
        }
        let hits = self.vector.query(task_description, 5).await;
        if hits.is_empty() {
            return "Vector context (RAG) is currently empty.".to_string();
        }

        let mut parts = vec!["Here are the most relevant code snippets based on the task:\n".to_string()];
        for hit in hits {
            parts.push(format!(
                "```python\n# From file: {} ({}: {})\n{}\n```",
                hit.metadata.file_path, hit.metadata.node_type, hit.metadata.node_name, hit.document
            ));
        }
        parts.join("\n\n")
    }

    // =====================================================================
    // Polish pass and completion
    // =====================================================================

    async fn run_final_polish_check(&self, goal: &str) {
        let diff = self.diff.lock().unified_diff(&self.project.project_root);
        if diff.trim().is_empty() {
            info!("No code changes detected. Skipping final polish.");
            return;
        }

        let file_tree = file_manifest(&self.project.project_root);
        let fixes = self.team.run_final_polish_linter(goal, &file_tree, &diff).await;
        if fixes.is_empty() {
            return;
        }

        for fix in fixes {
            let current = match read_file(&self.project.project_root, &fix.file_path) {
                Ok(Some(content)) => content,
                _ => {
                    error!("Final Polish: Cannot apply fix. File not found: {}", fix.file_path);
                    continue;
                }
            };
            if !current.contains(&fix.original_code_snippet) {
                warn!(
                    "Final Polish: Snippet to be replaced not found in {}. Skipping fix.",
                    fix.file_path
                );
                continue;
            }

            let patched = current.replacen(&fix.original_code_snippet, &fix.fixed_code_snippet, 1);
            match write_file(&self.project.project_root, &fix.file_path, &patched) {
                Ok(path) => {
                    info!("Final Polish: Applied fix to {} ({})", fix.file_path, fix.reason);
                    if fix.file_path.ends_with(".py") {
                        self.refresh_indices_for(&path, &patched).await;
                    }
                    self.team
                        .post_chat_message(
                            Speaker::Conductor,
                            &format!("Patched bug in `{}`.", fix.file_path),
                            false,
                        )
                        .await;
                }
                Err(e) => {
                    error!("Final Polish: Failed to apply fix to {}: {}", fix.file_path, e);
                }
            }
        }
    }

    async fn refresh_indices_for(&self, path: &Path, content: &str) {
        if let Err(e) = self.vector.reindex_file(path, content).await {
            warn!("Could not re-index {} after polish: {}", path.display(), e);
        }
        let relative = crate::workspace::project::relative_display(&self.project.project_root, path);
        self.symbols.write().update_file(&relative, content);
    }

    async fn handle_mission_completion(&self) {
        info!("Mission accomplished for user {}!", self.user_id);
        let summary = self.team.generate_mission_summary().await;
        self.team.post_chat_message(Speaker::Aura, &summary, false).await;
        self.hub
            .broadcast_to_user(&ServerMessage::MissionSuccess, self.user_id)
            .await;
    }
}

fn excerpt(content: &str) -> &str {
    let mut end = RAW_EXCERPT_BYTES.min(content.len());
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}
