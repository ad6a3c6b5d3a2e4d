// src/session/mod.rs
// Per-request service assembly. Every authenticated request (and every
// background task) gets a fresh bundle built from the process singletons
// plus the user's current database state.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::agents::{Conductor, DevelopmentTeam};
use crate::api::ApiError;
use crate::foundry::ToolContext;
use crate::index::{SymbolIndex, VectorIndex};
use crate::llm::roles::RoleMap;
use crate::mission::{DiffTracker, MissionLogStore};
use crate::state::AppState;
use crate::workspace::{ProjectContext, ProjectManager};

/// Request-scoped bundle: the user's decrypted role assignments plus their
/// workspace manager, on top of the shared singletons.
pub struct AgentSession {
    pub user_id: i64,
    pub roles: Arc<RoleMap>,
    pub projects: ProjectManager,
    state: Arc<AppState>,
}

impl AgentSession {
    pub async fn build(state: Arc<AppState>, user_id: i64) -> Result<Self> {
        let roles = RoleMap::load(&state.pool, user_id, &state.config.encryption_key)
            .await
            .context("failed to load model assignments")?;
        let projects = ProjectManager::new(&state.config.workspaces_root, user_id)?;
        Ok(Self {
            user_id,
            roles: Arc::new(roles),
            projects,
            state,
        })
    }

    /// Activates one project: loads its mission log and vector store from
    /// disk, rebuilds the symbol index, and wires the development team.
    pub fn open_project(&self, name: &str) -> Result<ProjectSession, ApiError> {
        let root = self
            .projects
            .load_project(name)
            .ok_or_else(|| ApiError::NotFound(format!("Project '{}' not found.", name)))?;

        let context = ProjectContext::detect(&root);
        let mission_log = Arc::new(Mutex::new(MissionLogStore::load(
            &root,
            self.user_id,
            self.state.hub.clone(),
        )));
        let vector = Arc::new(
            VectorIndex::open(&root, self.user_id).map_err(ApiError::Internal)?,
        );
        let mut symbols = SymbolIndex::new();
        symbols.build_for_project(&root);

        let team = Arc::new(DevelopmentTeam::new(
            self.user_id,
            name.to_string(),
            context.clone(),
            mission_log.clone(),
            self.state.hub.clone(),
            self.state.streamer.clone(),
            self.roles.clone(),
        ));

        Ok(ProjectSession {
            name: name.to_string(),
            context,
            mission_log,
            vector,
            symbols: Arc::new(RwLock::new(symbols)),
            team,
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

/// The services bound to one active project for the duration of a request
/// or background task.
pub struct ProjectSession {
    pub name: String,
    pub context: ProjectContext,
    pub mission_log: Arc<Mutex<MissionLogStore>>,
    pub vector: Arc<VectorIndex>,
    pub symbols: Arc<RwLock<SymbolIndex>>,
    pub team: Arc<DevelopmentTeam>,
}

impl ProjectSession {
    pub fn conductor(&self, session: &AgentSession) -> Conductor {
        let state = session.state();
        Conductor::new(
            session.user_id,
            self.context.clone(),
            self.mission_log.clone(),
            self.vector.clone(),
            self.symbols.clone(),
            self.team.clone(),
            state.foundry.clone(),
            state.hub.clone(),
            state.control.clone(),
        )
    }

    /// A standalone tool context (fresh diff tracker), for tool invocations
    /// outside a conductor loop.
    pub fn tool_context(&self, session: &AgentSession, user_goal: &str) -> ToolContext {
        ToolContext {
            user_id: session.user_id,
            user_goal: user_goal.to_string(),
            current_task_id: None,
            project: self.context.clone(),
            mission_log: self.mission_log.clone(),
            vector: self.vector.clone(),
            symbols: self.symbols.clone(),
            team: self.team.clone(),
            hub: session.state().hub.clone(),
            diff: Arc::new(parking_lot::Mutex::new(DiffTracker::new())),
        }
    }
}
