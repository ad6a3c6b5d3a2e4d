// src/foundry/context.rs
// The service bundle injected into every tool action. Replaces the original
// design's inject-by-parameter-name with one explicit, request-scoped value.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::Mutex;

use crate::agents::team::DevelopmentTeam;
use crate::api::ws::hub::BroadcastHub;
use crate::index::{SymbolIndex, VectorIndex};
use crate::mission::{DiffTracker, MissionLogStore};
use crate::workspace::project::{relative_display, ProjectContext};

pub struct ToolContext {
    pub user_id: i64,
    /// The mission's original user goal; feeds the coder prompt.
    pub user_goal: String,
    pub current_task_id: Option<i64>,
    pub project: ProjectContext,
    pub mission_log: Arc<Mutex<MissionLogStore>>,
    pub vector: Arc<VectorIndex>,
    pub symbols: Arc<RwLock<SymbolIndex>>,
    pub team: Arc<DevelopmentTeam>,
    pub hub: Arc<BroadcastHub>,
    pub diff: Arc<SyncMutex<DiffTracker>>,
}

impl ToolContext {
    pub fn project_root(&self) -> &Path {
        &self.project.project_root
    }

    pub fn relative(&self, path: &Path) -> String {
        relative_display(&self.project.project_root, path)
    }

    /// Refresh both per-project indices for a just-written file. Runs inside
    /// the tool action, before it reports success, so a mutation and its
    /// re-index form one logical step.
    pub async fn refresh_indices(&self, path: &Path, content: &str) -> Result<()> {
        self.vector.reindex_file(path, content).await?;
        let relative = self.relative(path);
        self.symbols.write().update_file(&relative, content);
        Ok(())
    }

    /// Snapshot a file's pre-mutation content for the polish-pass diff.
    pub fn snapshot_for_diff(&self, path: &Path) {
        let relative = self.relative(path);
        let original = std::fs::read_to_string(path).ok();
        self.diff.lock().record_before(&relative, original);
    }
}
