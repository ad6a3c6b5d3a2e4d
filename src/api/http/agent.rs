// src/api/http/agent.rs
// The agent facade: prompt intake (intent classification), mission dispatch
// and cooperative stop. Long-running work is detached onto background tasks
// that rebuild their own service bundle.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::current_user;
use crate::agents::team::Intent;
use crate::api::ws::message::{AgentStatus, ServerMessage};
use crate::api::ApiError;
use crate::llm::ChatMessage;
use crate::session::AgentSession;
use crate::state::AppState;

pub fn create_agent_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dispatch", post(dispatch_mission))
        .route("/{project_name}/prompt", post(handle_prompt))
        .route("/{project_name}/stop", post(stop_mission))
}

#[derive(Deserialize)]
struct PromptRequest {
    prompt: String,
    #[serde(default)]
    history: Vec<ChatMessage>,
}

/// Classifies the prompt's intent (PLAN or CHAT) and fans out to the
/// planning assembly line or the companion streamer as a background task.
async fn handle_prompt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
    Json(req): Json<PromptRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = current_user(&state, &headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    let project = session.open_project(&project_name)?;

    let intent = project
        .team
        .determine_user_intent(&req.prompt, &req.history)
        .await;

    let message = match intent {
        Intent::Plan => {
            spawn_background(state.clone(), user.id, true, "A critical error occurred while generating the plan", {
                let prompt = req.prompt.clone();
                let project_name = project_name.clone();
                let state = state.clone();
                let user_id = user.id;
                async move {
                    let session = AgentSession::build(state, user_id).await?;
                    let project = session
                        .open_project(&project_name)
                        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
                    project.team.run_planner_workflow(&prompt).await
                }
            });
            "Aura has received your request and is formulating a plan."
        }
        Intent::Chat => {
            spawn_background(state.clone(), user.id, true, "A critical error occurred during chat", {
                let prompt = req.prompt.clone();
                let history = req.history.clone();
                let project_name = project_name.clone();
                let state = state.clone();
                let user_id = user.id;
                async move {
                    let session = AgentSession::build(state, user_id).await?;
                    let project = session
                        .open_project(&project_name)
                        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
                    project.team.run_companion_chat(&prompt, &history).await;
                    Ok(())
                }
            });
            "Chat request received. Response will be streamed via WebSocket."
        }
    };

    Ok((StatusCode::ACCEPTED, Json(json!({ "message": message }))))
}

#[derive(Deserialize)]
struct DispatchRequest {
    project_name: String,
}

/// Schedules the mission conductor for the named project.
async fn dispatch_mission(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<DispatchRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = current_user(&state, &headers).await?;
    // Validate the project exists before acknowledging the dispatch.
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    session.open_project(&req.project_name)?;

    info!("Dispatching mission for user {} on project '{}'", user.id, req.project_name);
    spawn_background(state.clone(), user.id, false, "A critical error occurred during mission execution", {
        let state = state.clone();
        let user_id = user.id;
        let project_name = req.project_name.clone();
        async move {
            let session = AgentSession::build(state, user_id).await?;
            let project = session
                .open_project(&project_name)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            let conductor = project.conductor(&session);
            conductor.execute_mission_in_background().await;
            Ok(())
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Dispatch acknowledged. Aura is now executing the mission plan." })),
    ))
}

async fn stop_mission(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(_project_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = current_user(&state, &headers).await?;
    info!("Received stop request for user {}'s mission.", user.id);
    state.control.request_stop(user.id);
    Ok(Json(json!({
        "message": format!("Stop signal sent for user {}'s mission.", user.id)
    })))
}

/// Detach a background task with the standard teardown: errors are logged
/// and surfaced as `system_log`, and `agent_status: idle` is emitted when
/// requested. The conductor owns its own idle broadcast.
fn spawn_background<F>(
    state: Arc<AppState>,
    user_id: i64,
    send_idle_status: bool,
    error_prefix: &'static str,
    task: F,
) where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            error!("FATAL ERROR in background task for user {}: {:#}", user_id, e);
            state
                .hub
                .broadcast_to_user(
                    &ServerMessage::SystemLog {
                        content: format!("{}: {}", error_prefix, e),
                    },
                    user_id,
                )
                .await;
        }
        if send_idle_status {
            state
                .hub
                .broadcast_to_user(
                    &ServerMessage::AgentStatus {
                        status: AgentStatus::Idle,
                    },
                    user_id,
                )
                .await;
        }
    });
}
