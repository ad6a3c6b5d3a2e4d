// src/agents/team.rs
// The planning and support crew behind the conductor: intent detection, the
// Architect -> Auditor -> Sequencer assembly line, streamed code generation,
// strategic re-planning, the polish linter and mission summaries.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::prompts::{self, render};
use crate::api::ws::hub::BroadcastHub;
use crate::api::ws::message::ServerMessage;
use crate::llm::roles::{RoleMap, ROLE_CHAT, ROLE_CODER, ROLE_PLANNER};
use crate::llm::{ChatMessage, LlmRequest, LlmStreamer};
use crate::mission::MissionLogStore;
use crate::pycode;
use crate::workspace::project::{list_relative_files, read_file, ProjectContext};

lazy_static! {
    static ref JSON_OBJECT_RE: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
    static ref CODE_FENCE_RE: Regex = Regex::new(r"(?s)```(?:python\n)?(.*?)```").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Plan,
    Chat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolishFix {
    pub file_path: String,
    pub original_code_snippet: String,
    pub fixed_code_snippet: String,
    pub reason: String,
}

/// Who a chat message is attributed to; decides the wire message type.
#[derive(Debug, Clone, Copy)]
pub enum Speaker {
    Aura,
    Conductor,
}

pub struct DevelopmentTeam {
    user_id: i64,
    project_name: String,
    project: ProjectContext,
    mission_log: Arc<Mutex<MissionLogStore>>,
    hub: Arc<BroadcastHub>,
    streamer: Arc<LlmStreamer>,
    roles: Arc<RoleMap>,
}

impl DevelopmentTeam {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: i64,
        project_name: String,
        project: ProjectContext,
        mission_log: Arc<Mutex<MissionLogStore>>,
        hub: Arc<BroadcastHub>,
        streamer: Arc<LlmStreamer>,
        roles: Arc<RoleMap>,
    ) -> Self {
        Self {
            user_id,
            project_name,
            project,
            mission_log,
            hub,
            streamer,
            roles,
        }
    }

    // =====================================================================
    // Messaging helpers
    // =====================================================================

    pub async fn post_chat_message(&self, sender: Speaker, message: &str, is_error: bool) {
        if message.trim().is_empty() {
            return;
        }
        let message = message.to_string();
        let outbound = match (sender, is_error) {
            (Speaker::Aura, false) => ServerMessage::AuraResponse { content: message },
            _ => ServerMessage::SystemLog { content: message },
        };
        self.hub.broadcast_to_user(&outbound, self.user_id).await;
    }

    pub async fn handle_error(&self, agent: &str, error_msg: &str) {
        error!("{} failed for user {}: {}", agent, self.user_id, error_msg);
        self.post_chat_message(Speaker::Aura, error_msg, true).await;
    }

    async fn broadcast_phase(&self, label: &str) {
        self.hub
            .broadcast_to_user(
                &ServerMessage::Phase {
                    content: label.to_string(),
                },
                self.user_id,
            )
            .await;
    }

    /// One JSON-mode call against a role, with errors narrated to the user.
    pub async fn invoke_role_json(&self, role: &str, prompt: String) -> Result<String> {
        let request = LlmRequest::new(role, vec![ChatMessage::user(prompt)]).json();
        Ok(self.streamer.invoke(self.user_id, &self.roles, request).await?)
    }

    /// Parses a JSON reply, salvaging the first `{...}` block when a model
    /// wraps its JSON in prose.
    pub fn parse_json_response(&self, response: &str) -> Result<Value> {
        if let Ok(value) = serde_json::from_str::<Value>(response.trim()) {
            return Ok(value);
        }
        let block = JSON_OBJECT_RE
            .find(response)
            .ok_or_else(|| anyhow!("no JSON object found in the response. Raw: {}", response))?;
        Ok(serde_json::from_str(block.as_str())?)
    }

    // =====================================================================
    // Intent detection and companion chat
    // =====================================================================

    pub async fn determine_user_intent(&self, user_prompt: &str, history: &[ChatMessage]) -> Intent {
        info!("Determining intent for user {}: '{:.50}...'", self.user_id, user_prompt);
        let prompt = render(
            prompts::INTENT_DETECTION_PROMPT,
            &[
                ("conversation_history", &format_history(history)),
                ("user_prompt", user_prompt),
            ],
        );
        let response = match self.invoke_role_json(ROLE_PLANNER, prompt).await {
            Ok(response) => response,
            Err(e) => {
                self.handle_error("IntentDetector", &e.to_string()).await;
                return Intent::Chat;
            }
        };

        match self
            .parse_json_response(&response)
            .ok()
            .and_then(|v| v.get("intent").and_then(Value::as_str).map(str::to_uppercase))
        {
            Some(intent) if intent == "PLAN" => Intent::Plan,
            Some(intent) if intent == "CHAT" => Intent::Chat,
            other => {
                warn!("Intent detector returned {:?}. Defaulting to CHAT.", other);
                Intent::Chat
            }
        }
    }

    pub async fn run_companion_chat(&self, user_prompt: &str, history: &[ChatMessage]) {
        info!("Companion chat initiated for user {}", self.user_id);
        let prompt = render(
            prompts::COMPANION_PROMPT,
            &[
                ("conversation_history", &format_history(history)),
                ("user_prompt", user_prompt),
            ],
        );
        let request = LlmRequest::new(ROLE_CHAT, vec![ChatMessage::user(prompt)]);
        match self.streamer.invoke(self.user_id, &self.roles, request).await {
            Ok(reply) if !reply.trim().is_empty() => {
                self.post_chat_message(Speaker::Aura, &reply, false).await;
            }
            Ok(_) => {}
            Err(e) => {
                self.handle_error("Companion", &e.to_string()).await;
                self.post_chat_message(
                    Speaker::Aura,
                    "I'm sorry, I seem to be having trouble connecting to my creative core right now.",
                    false,
                )
                .await;
            }
        }
    }

    // =====================================================================
    // The planning assembly line: Architect -> Auditor -> Sequencer
    // =====================================================================

    pub async fn run_planner_workflow(&self, user_idea: &str) -> Result<()> {
        info!(
            "Planning assembly line initiated for user {}: '{:.50}...'",
            self.user_id, user_idea
        );

        // --- Phase 1: Architect ---
        self.broadcast_phase("Architect is drafting the blueprint...").await;
        let architect_prompt = render(
            prompts::ARCHITECT_PROMPT,
            &[("user_idea", user_idea), ("project_name", &self.project_name)],
        );
        let blueprint_response = match self.invoke_role_json(ROLE_PLANNER, architect_prompt).await {
            Ok(response) => response,
            Err(e) => {
                self.handle_error("Architect", &e.to_string()).await;
                return Ok(());
            }
        };
        let final_blueprint = match self
            .parse_json_response(&blueprint_response)
            .map(|v| v.get("final_blueprint").cloned())
        {
            Ok(Some(blueprint)) if blueprint.is_object() => blueprint,
            _ => {
                self.handle_error(
                    "Architect",
                    "Failed to create a valid blueprint: final_blueprint was missing or malformed.",
                )
                .await;
                return Ok(());
            }
        };

        // --- Phase 2: Auditor ---
        if !self.run_plan_audit(user_idea, &final_blueprint).await {
            // The audit verdict is final; the mission log stays untouched.
            return Ok(());
        }

        // --- Phase 3: Sequencer ---
        self.broadcast_phase("Sequencer is generating the detailed task list...").await;
        let sequencer_prompt = render(
            prompts::SEQUENCER_PROMPT,
            &[(
                "blueprint",
                &serde_json::to_string_pretty(&final_blueprint)?,
            )],
        );
        let plan_response = match self.invoke_role_json(ROLE_PLANNER, sequencer_prompt).await {
            Ok(response) => response,
            Err(e) => {
                self.handle_error("Sequencer", &e.to_string()).await;
                return Ok(());
            }
        };

        let mut steps: Vec<String> = match self
            .parse_json_response(&plan_response)
            .map(|v| v.get("final_plan").cloned())
        {
            Ok(Some(Value::Array(items))) if !items.is_empty() => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => {
                self.handle_error("Sequencer", "Failed to create a valid plan: final_plan was empty or malformed.")
                    .await;
                return Ok(());
            }
        };

        let dependencies: Vec<String> = final_blueprint
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(|d| d.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        if !dependencies.is_empty() {
            steps.insert(
                0,
                format!(
                    "Add the following dependencies to requirements.txt: {}",
                    dependencies.join(", ")
                ),
            );
        }

        self.mission_log
            .lock()
            .await
            .set_initial_plan(user_idea, &steps)
            .await;
        self.post_chat_message(
            Speaker::Aura,
            "Plan approved by Auditor. Review in 'Agent TODO' and dispatch to begin.",
            false,
        )
        .await;
        Ok(())
    }

    async fn run_plan_audit(&self, user_prompt: &str, blueprint: &Value) -> bool {
        self.broadcast_phase("Auditor is verifying the plan's correctness...").await;
        let prompt = render(
            prompts::AUDITOR_PROMPT,
            &[
                ("user_prompt", user_prompt),
                (
                    "blueprint",
                    &serde_json::to_string_pretty(blueprint).unwrap_or_default(),
                ),
            ],
        );
        let response = match self.invoke_role_json(ROLE_PLANNER, prompt).await {
            Ok(response) => response,
            Err(e) => {
                self.handle_error("Auditor", &e.to_string()).await;
                return false;
            }
        };

        match self
            .parse_json_response(&response)
            .map(|v| v.get("audit_passed").and_then(Value::as_bool))
        {
            Ok(Some(true)) => {
                info!("AUDIT PASSED: The plan is aligned with the user's request.");
                true
            }
            Ok(_) => {
                error!("AUDIT FAILED: The blueprint did not match the user's core requirements.");
                self.handle_error(
                    "Auditor",
                    "Audit failed. The Architect's plan was incorrect. Halting mission.",
                )
                .await;
                false
            }
            Err(e) => {
                self.handle_error("Auditor", &format!("Failed to parse audit JSON: {}", e))
                    .await;
                false
            }
        }
    }

    // =====================================================================
    // Streamed code generation (used by the write_file tool)
    // =====================================================================

    /// Generates the body of one file with the coder role, streaming chunks
    /// to the user as `code_stream_chunk` and validating the result parses
    /// before it is accepted.
    pub async fn generate_code_for_task(
        &self,
        path: &str,
        task_description: &str,
        user_idea: &str,
        current_task_id: i64,
    ) -> Result<String> {
        info!("Generating code for '{}'...", path);
        let root = &self.project.project_root;
        let schema_content = read_file(root, "src/schemas.py")?
            .unwrap_or_else(|| "# src/schemas.py not found or is empty.".to_string());
        let models_content = read_file(root, "src/models.py")?
            .unwrap_or_else(|| "# src/models.py not found or is empty.".to_string());
        let data_contract = format!(
            "--- Contents of src/schemas.py ---\n{}\n\n--- Contents of src/models.py ---\n{}",
            schema_content, models_content
        );

        let file_tree = file_manifest(root);
        let plan_context = self.relevant_plan_context(current_task_id).await;

        let prompt = render(
            prompts::CODER_PROMPT_STREAMING,
            &[
                ("path", path),
                ("task_description", task_description),
                ("file_tree", &file_tree),
                ("user_idea", user_idea),
                ("relevant_plan_context", &plan_context),
                ("schema_and_models_context", &data_contract),
            ],
        );

        let request = LlmRequest::new(ROLE_CODER, vec![ChatMessage::user(prompt)])
            .stream_as("code_stream_chunk", path);
        let full_code = self.streamer.invoke(self.user_id, &self.roles, request).await?;

        let clean_code = CODE_FENCE_RE
            .captures(&full_code)
            .and_then(|captures| captures.get(1))
            .map(|code| code.as_str().trim().to_string())
            .unwrap_or_else(|| full_code.trim().to_string());
        if clean_code.is_empty() {
            bail!("the AI failed to generate any code for '{}'; the response was empty", path);
        }

        match pycode::syntax_error(&clean_code) {
            None => {
                info!("Generated code for '{}' is syntactically valid.", path);
                Ok(clean_code)
            }
            Some(error) => bail!("AI-generated code for '{}' has a syntax error: {}", path, error),
        }
    }

    /// Previous / current / next task view, so the coder knows its place in
    /// the plan without drowning in the whole log.
    async fn relevant_plan_context(&self, current_task_id: i64) -> String {
        let tasks = self.mission_log.lock().await.tasks();
        let Some(index) = tasks.iter().position(|t| t.id == current_task_id) else {
            return "Could not find the current task in the plan.".to_string();
        };

        let mut lines = Vec::new();
        if index > 0 {
            let prev = &tasks[index - 1];
            lines.push(format!(
                "Previous Task (ID {}): {} [Status: {}]",
                prev.id,
                prev.description,
                if prev.done { "Done" } else { "Pending" }
            ));
        }
        let current = &tasks[index];
        lines.push(format!(
            "--> CURRENT TASK (ID {}): {} [Status: Pending]",
            current.id, current.description
        ));
        if index + 1 < tasks.len() {
            let next = &tasks[index + 1];
            lines.push(format!(
                "Next Task (ID {}): {} [Status: Pending]",
                next.id, next.description
            ));
        }
        lines.join("\n")
    }

    // =====================================================================
    // Strategic re-plan, polish linter, mission summary
    // =====================================================================

    pub async fn run_strategic_replan(
        &self,
        original_goal: &str,
        failed_task_id: i64,
        failed_task_description: &str,
        last_error: Option<&str>,
    ) -> Result<()> {
        info!("Strategic re-plan initiated.");
        let mission_log_str = {
            let log = self.mission_log.lock().await;
            format_mission_log(&log.tasks())
        };
        let failed_task_str = format!("ID {}: {}", failed_task_id, failed_task_description);
        let error_message = last_error.unwrap_or("No specific error message was recorded.");

        let prompt = render(
            prompts::REPLANNER_PROMPT,
            &[
                ("user_goal", original_goal),
                ("mission_log", &mission_log_str),
                ("failed_task", &failed_task_str),
                ("error_message", error_message),
            ],
        );
        let response = match self.invoke_role_json(ROLE_PLANNER, prompt).await {
            Ok(response) => response,
            Err(e) => {
                self.handle_error("Aura", &e.to_string()).await;
                return Ok(());
            }
        };

        let steps: Vec<String> = match self
            .parse_json_response(&response)
            .map(|v| v.get("plan").cloned())
        {
            Ok(Some(Value::Array(items))) if !items.is_empty() => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => {
                self.handle_error("Aura", "I failed to create a valid recovery plan.")
                    .await;
                error!("Re-planner failure for user {}. Raw response: {}", self.user_id, response);
                return Ok(());
            }
        };

        self.mission_log
            .lock()
            .await
            .replace_tasks_from_id(failed_task_id, &steps)
            .await;
        info!("Successfully replaced failed task for user {} with a new plan.", self.user_id);
        self.post_chat_message(Speaker::Aura, "I have a new plan. Resuming execution.", false)
            .await;
        Ok(())
    }

    /// Invokes the meticulous-linter persona over the mission's diff and
    /// returns its proposed patches.
    pub async fn run_final_polish_linter(
        &self,
        user_idea: &str,
        file_tree: &str,
        diff: &str,
    ) -> Vec<PolishFix> {
        info!("Running Final Polish check on newly generated code...");
        self.post_chat_message(
            Speaker::Conductor,
            "Code generation complete. Performing final quality review...",
            false,
        )
        .await;

        let prompt = render(
            prompts::METICULOUS_LINTER_PROMPT,
            &[("user_idea", user_idea), ("file_tree", file_tree), ("diff", diff)],
        );
        let response = match self.invoke_role_json(ROLE_PLANNER, prompt).await {
            Ok(response) => response,
            Err(e) => {
                self.handle_error("FinalPolish", &e.to_string()).await;
                return Vec::new();
            }
        };

        let fixes: Vec<PolishFix> = match self
            .parse_json_response(&response)
            .map(|v| v.get("fixes").cloned())
        {
            Ok(Some(fixes_value)) => serde_json::from_value(fixes_value).unwrap_or_default(),
            _ => {
                self.handle_error("FinalPolish", "Failed to parse Linter AI JSON.").await;
                return Vec::new();
            }
        };

        if fixes.is_empty() {
            info!("Final Polish found no issues. The code is clean!");
            self.post_chat_message(
                Speaker::Conductor,
                "Final quality review passed with no issues.",
                false,
            )
            .await;
        } else {
            info!("Final Polish found {} issue(s) to correct.", fixes.len());
            self.post_chat_message(
                Speaker::Conductor,
                &format!(
                    "Found {} small bug(s). Applying automated patches...",
                    fixes.len()
                ),
                false,
            )
            .await;
        }
        fixes
    }

    pub async fn generate_mission_summary(&self) -> String {
        let completed: Vec<String> = {
            let log = self.mission_log.lock().await;
            log.tasks()
                .iter()
                .filter(|t| t.done)
                .map(|t| format!("- {}", t.description))
                .collect()
        };
        if completed.is_empty() {
            return "Mission accomplished!".to_string();
        }

        let prompt = render(
            prompts::MISSION_SUMMARY_PROMPT,
            &[("completed_tasks", &completed.join("\n"))],
        );
        let request = LlmRequest::new(ROLE_CHAT, vec![ChatMessage::user(prompt)]);
        match self.streamer.invoke(self.user_id, &self.roles, request).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            _ => "Mission accomplished!".to_string(),
        }
    }
}

pub fn format_history(history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return "(no prior conversation)".to_string();
    }
    history
        .iter()
        .map(|message| format!("{}: {}", message.role, message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_mission_log(tasks: &[crate::mission::Task]) -> String {
    if tasks.is_empty() {
        return "This is the first task.".to_string();
    }
    tasks
        .iter()
        .map(|task| {
            format!(
                "- ID {} ({}): {}",
                task.id,
                if task.done { "Done" } else { "Pending" },
                task.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn file_manifest(project_root: &Path) -> String {
    let files = list_relative_files(project_root);
    if files.is_empty() {
        "The project is currently empty.".to_string()
    } else {
        files.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_for_tests() -> (tempfile::TempDir, DevelopmentTeam) {
        let dir = tempfile::tempdir().unwrap();
        let hub = Arc::new(BroadcastHub::new());
        let control = Arc::new(crate::mission::MissionControl::new());
        let streamer = Arc::new(LlmStreamer::new(
            "http://localhost:0".to_string(),
            hub.clone(),
            control,
        ));
        let log = MissionLogStore::load(dir.path(), 1, hub.clone());
        let team = DevelopmentTeam::new(
            1,
            "demo".to_string(),
            ProjectContext::detect(dir.path()),
            Arc::new(Mutex::new(log)),
            hub,
            streamer,
            Arc::new(RoleMap::default()),
        );
        (dir, team)
    }

    #[test]
    fn parse_json_salvages_wrapped_objects() {
        let (_dir, team) = team_for_tests();
        let direct = team.parse_json_response(r#"{"intent": "PLAN"}"#).unwrap();
        assert_eq!(direct["intent"], "PLAN");

        let wrapped = team
            .parse_json_response("Sure! Here is the JSON you asked for:\n{\"intent\": \"CHAT\"}\nHope that helps!")
            .unwrap();
        assert_eq!(wrapped["intent"], "CHAT");

        assert!(team.parse_json_response("no json here at all").is_err());
    }

    #[test]
    fn mission_log_formatting_matches_protocol() {
        let tasks = vec![
            crate::mission::Task {
                id: 1,
                description: "Create file main.py".into(),
                done: true,
                tool_call: None,
                last_error: None,
            },
            crate::mission::Task {
                id: 2,
                description: "Write a print statement in main.py".into(),
                done: false,
                tool_call: None,
                last_error: None,
            },
        ];
        let formatted = format_mission_log(&tasks);
        assert!(formatted.contains("- ID 1 (Done): Create file main.py"));
        assert!(formatted.contains("- ID 2 (Pending): Write a print statement in main.py"));
        assert_eq!(format_mission_log(&[]), "This is the first task.");
    }
}
