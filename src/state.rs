// src/state.rs
// Process-wide application state shared across handlers.

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use crate::api::ws::hub::BroadcastHub;
use crate::config::AppConfig;
use crate::db;
use crate::foundry::Foundry;
use crate::llm::LlmStreamer;
use crate::mission::MissionControl;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: SqlitePool,
    pub hub: Arc<BroadcastHub>,
    pub control: Arc<MissionControl>,
    pub foundry: Arc<Foundry>,
    pub streamer: Arc<LlmStreamer>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let pool = db::init_pool(&config.database_url).await?;

        std::fs::create_dir_all(&config.workspaces_root)?;

        let hub = Arc::new(BroadcastHub::new());
        let control = Arc::new(MissionControl::new());
        let foundry = Arc::new(Foundry::with_builtin_tools());
        let streamer = Arc::new(LlmStreamer::new(
            config.llm_server_url.clone(),
            hub.clone(),
            control.clone(),
        ));

        info!("Application state initialized");
        Ok(Self {
            config: Arc::new(config),
            pool,
            hub,
            control,
            foundry,
            streamer,
        })
    }
}
