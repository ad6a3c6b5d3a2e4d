// src/api/http/router.rs
// Composes the full HTTP + WebSocket surface.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use super::{agent, assignments, auth, keys, missions, projects};
use crate::api::ws::command_deck_ws;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let projects_router = projects::create_projects_router().merge(agent::create_agent_router());

    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::create_auth_router())
        .nest("/keys", keys::create_keys_router())
        .nest("/assignments", assignments::create_assignments_router())
        .nest("/projects", projects_router)
        .nest("/missions", missions::create_missions_router())
        .route("/ws/command_deck", get(command_deck_ws))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
