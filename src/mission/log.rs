// src/mission/log.rs
// The Mission Log: the durable, ordered task list of a mission. Mirrored to
// `mission_log.json` at the project root after every mutation; the UI
// snapshot is re-read from disk so notification state can never race ahead
// of persistence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::api::ws::hub::BroadcastHub;
use crate::api::ws::message::{MissionLogPayload, ServerMessage};

pub const MISSION_LOG_FILENAME: &str = "mission_log.json";

/// One imperative step of a mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub description: String,
    pub done: bool,
    #[serde(default)]
    pub tool_call: Option<Value>,
    #[serde(default)]
    pub last_error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MissionLogFile {
    #[serde(default)]
    initial_goal: String,
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Manages the Mission Log for one active project.
pub struct MissionLogStore {
    project_root: PathBuf,
    user_id: i64,
    hub: Arc<BroadcastHub>,
    tasks: Vec<Task>,
    next_id: i64,
    initial_goal: String,
}

impl MissionLogStore {
    /// Loads the log from disk for the active project, starting fresh when
    /// the file is absent or unreadable. Saves on load so the file exists
    /// for new projects.
    pub fn load(project_root: &Path, user_id: i64, hub: Arc<BroadcastHub>) -> Self {
        let mut store = Self {
            project_root: project_root.to_path_buf(),
            user_id,
            hub,
            tasks: Vec::new(),
            next_id: 1,
            initial_goal: String::new(),
        };

        let path = store.log_path();
        if path.exists() {
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|raw| serde_json::from_str::<MissionLogFile>(&raw).map_err(Into::into))
            {
                Ok(file) => {
                    store.next_id = file.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
                    store.tasks = file.tasks;
                    store.initial_goal = file.initial_goal;
                    info!("Loaded mission log from {}", path.display());
                }
                Err(e) => {
                    error!("Failed to load mission log at {}: {}. Starting fresh.", path.display(), e);
                }
            }
        } else {
            info!("No existing mission log for this project. Starting fresh.");
        }

        if let Err(e) = store.save_to_disk() {
            error!("Failed to persist mission log: {}", e);
        }
        store
    }

    fn log_path(&self) -> PathBuf {
        self.project_root.join(MISSION_LOG_FILENAME)
    }

    fn save_to_disk(&self) -> Result<()> {
        let file = MissionLogFile {
            initial_goal: self.initial_goal.clone(),
            tasks: self.tasks.clone(),
        };
        let path = self.log_path();
        let raw = serde_json::to_string_pretty(&file)?;
        std::fs::write(&path, raw)
            .with_context(|| format!("failed to save mission log to {}", path.display()))?;
        debug!("Mission log saved to {}", path.display());
        Ok(())
    }

    /// Notifies the UI with the ground truth re-read from disk. Stateless on
    /// purpose: the broadcast can never disagree with what was persisted.
    async fn notify_ui(&self) {
        let tasks = match std::fs::read_to_string(self.log_path()) {
            Ok(raw) => serde_json::from_str::<MissionLogFile>(&raw)
                .map(|file| file.tasks)
                .unwrap_or_default(),
            Err(e) => {
                error!("Could not read mission log from disk for UI notification: {}", e);
                Vec::new()
            }
        };
        self.hub
            .broadcast_to_user(
                &ServerMessage::MissionLogUpdated {
                    content: MissionLogPayload { tasks },
                },
                self.user_id,
            )
            .await;
    }

    async fn persist_and_notify(&self) {
        if let Err(e) = self.save_to_disk() {
            error!("Failed to persist mission log: {}", e);
        }
        self.notify_ui().await;
    }

    fn push_task(&mut self, description: String, tool_call: Option<Value>) -> Task {
        let task = Task {
            id: self.next_id,
            description,
            done: false,
            tool_call,
            last_error: None,
        };
        self.next_id += 1;
        self.tasks.push(task.clone());
        task
    }

    /// Clears all tasks and installs a new plan, storing the original goal.
    pub async fn set_initial_plan(&mut self, goal: &str, steps: &[String]) {
        self.tasks.clear();
        self.next_id = 1;
        self.initial_goal = goal.to_string();
        for step in steps {
            self.push_task(step.clone(), None);
        }
        self.persist_and_notify().await;
        info!("Initial plan with {} steps has been set", self.tasks.len());
    }

    pub async fn add_task(&mut self, description: &str, tool_call: Option<Value>) -> Result<Task> {
        if description.trim().is_empty() {
            bail!("task description cannot be empty");
        }
        let task = self.push_task(description.to_string(), tool_call);
        info!("Added task {}: '{}'", task.id, description);
        self.persist_and_notify().await;
        Ok(task)
    }

    /// Marks a task as completed. Idempotent; clears any recorded error.
    pub async fn mark_done(&mut self, task_id: i64) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            warn!("Attempted to mark non-existent task {} as done", task_id);
            return false;
        };
        if !task.done {
            task.done = true;
            task.last_error = None;
            self.persist_and_notify().await;
            info!("Marked task {} as done", task_id);
        }
        true
    }

    /// Records the most recent failure for a task. Persisted, not broadcast:
    /// the retry loop owns the narration.
    pub fn set_last_error(&mut self, task_id: i64, error: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            task.last_error = Some(error.to_string());
            if let Err(e) = self.save_to_disk() {
                error!("Failed to persist mission log: {}", e);
            }
        }
    }

    pub async fn update_task(&mut self, task_id: i64, description: &str) -> Result<bool> {
        if description.trim().is_empty() {
            bail!("task description cannot be empty");
        }
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            warn!("Attempted to update non-existent task {}", task_id);
            return Ok(false);
        };
        task.description = description.to_string();
        self.persist_and_notify().await;
        Ok(true)
    }

    pub async fn delete_task(&mut self, task_id: i64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() == before {
            warn!("Attempted to delete non-existent task {}", task_id);
            return false;
        }
        self.persist_and_notify().await;
        true
    }

    /// Reorders the task list. Succeeds only when `ordered_ids` is a
    /// permutation of the current ids; otherwise state is untouched.
    pub async fn reorder(&mut self, ordered_ids: &[i64]) -> bool {
        let mut current: Vec<i64> = self.tasks.iter().map(|t| t.id).collect();
        let mut requested = ordered_ids.to_vec();
        current.sort_unstable();
        requested.sort_unstable();
        if current != requested {
            error!("Task reorder request has mismatched or invalid IDs");
            return false;
        }

        self.tasks.sort_by_key(|task| {
            ordered_ids
                .iter()
                .position(|id| *id == task.id)
                .unwrap_or(usize::MAX)
        });
        self.persist_and_notify().await;
        true
    }

    /// Truncates the plan at `start_task_id` and appends a freshly numbered
    /// suffix. Used by the strategic re-plan.
    pub async fn replace_tasks_from_id(&mut self, start_task_id: i64, new_steps: &[String]) -> bool {
        let Some(start_index) = self.tasks.iter().position(|t| t.id == start_task_id) else {
            error!("Could not find task {} to start replacement", start_task_id);
            return false;
        };
        self.tasks.truncate(start_index);
        for step in new_steps {
            self.push_task(step.clone(), None);
        }
        self.persist_and_notify().await;
        info!(
            "Replaced tasks from id {} with a new plan of {} steps",
            start_task_id,
            new_steps.len()
        );
        true
    }

    pub async fn clear_all(&mut self) {
        if !self.tasks.is_empty() {
            self.tasks.clear();
            self.next_id = 1;
            self.initial_goal.clear();
            self.persist_and_notify().await;
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn pending_tasks(&self) -> Vec<Task> {
        self.tasks.iter().filter(|t| !t.done).cloned().collect()
    }

    pub fn task(&self, task_id: i64) -> Option<Task> {
        self.tasks.iter().find(|t| t.id == task_id).cloned()
    }

    pub fn initial_goal(&self) -> &str {
        &self.initial_goal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> MissionLogStore {
        MissionLogStore::load(dir, 1, Arc::new(BroadcastHub::new()))
    }

    #[tokio::test]
    async fn ids_are_monotonic_even_after_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = store(dir.path());
        let a = log.add_task("first", None).await.unwrap();
        let b = log.add_task("second", None).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        assert!(log.delete_task(2).await);
        let c = log.add_task("third", None).await.unwrap();
        assert_eq!(c.id, 3, "deleted ids must never be reused");
    }

    #[tokio::test]
    async fn mark_done_is_idempotent_and_clears_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = store(dir.path());
        let task = log.add_task("do the thing", None).await.unwrap();
        log.set_last_error(task.id, "boom");
        assert_eq!(log.task(task.id).unwrap().last_error.as_deref(), Some("boom"));

        assert!(log.mark_done(task.id).await);
        assert!(log.mark_done(task.id).await);
        let task = log.task(task.id).unwrap();
        assert!(task.done);
        assert!(task.last_error.is_none());
        assert!(!log.mark_done(99).await);
    }

    #[tokio::test]
    async fn reorder_rejects_non_permutations() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = store(dir.path());
        for step in ["a", "b", "c"] {
            log.add_task(step, None).await.unwrap();
        }

        assert!(!log.reorder(&[1, 2]).await);
        assert!(!log.reorder(&[1, 2, 4]).await);
        let order: Vec<i64> = log.tasks().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![1, 2, 3], "failed reorder must not mutate state");

        assert!(log.reorder(&[3, 1, 2]).await);
        let order: Vec<i64> = log.tasks().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn replace_tasks_from_id_truncates_and_renumbers() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = store(dir.path());
        for step in ["a", "b", "c", "d"] {
            log.add_task(step, None).await.unwrap();
        }
        log.mark_done(1).await;

        assert!(log.replace_tasks_from_id(3, &["x".into(), "y".into()]).await);
        let tasks = log.tasks();
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 5, 6], "suffix gets fresh ids past the old maximum");
        assert_eq!(tasks[2].description, "x");

        // Replacing with an empty plan truncates and appends nothing.
        assert!(log.replace_tasks_from_id(2, &[]).await);
        assert_eq!(log.tasks().len(), 1);
        assert!(!log.replace_tasks_from_id(42, &["z".into()]).await);
    }

    #[tokio::test]
    async fn state_survives_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = store(dir.path());
            log.set_initial_plan("build a calculator", &["a".into(), "b".into()]).await;
            log.mark_done(1).await;
        }

        let log = store(dir.path());
        assert_eq!(log.initial_goal(), "build a calculator");
        assert_eq!(log.tasks().len(), 2);
        assert!(log.task(1).unwrap().done);

        // next_id continues past the highest persisted id
        let mut log = log;
        let task = log.add_task("c", None).await.unwrap();
        assert_eq!(task.id, 3);
    }

    #[tokio::test]
    async fn set_initial_plan_resets_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = store(dir.path());
        for step in ["a", "b", "c"] {
            log.add_task(step, None).await.unwrap();
        }
        log.set_initial_plan("fresh goal", &["one".into()]).await;
        let tasks = log.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 1);
        assert_eq!(log.initial_goal(), "fresh goal");
    }

    #[tokio::test]
    async fn empty_description_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = store(dir.path());
        assert!(log.add_task("   ", None).await.is_err());
        log.add_task("real", None).await.unwrap();
        assert!(log.update_task(1, "").await.is_err());
    }
}
