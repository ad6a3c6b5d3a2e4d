// src/api/http/missions.rs
// Mission-log CRUD: add, update, delete and reorder tasks for a project.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, post, put};
use axum::Router;
use serde::Deserialize;

use super::current_user;
use crate::api::ApiError;
use crate::mission::Task;
use crate::session::{AgentSession, ProjectSession};
use crate::state::AppState;

pub fn create_missions_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{project_name}/tasks", post(add_task))
        .route("/{project_name}/tasks/{task_id}", put(update_task))
        .route("/{project_name}/tasks/{task_id}", delete(delete_task))
        .route("/{project_name}/tasks/reorder", post(reorder_tasks))
}

async fn open_project_session(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    project_name: &str,
) -> Result<(AgentSession, ProjectSession), ApiError> {
    let user = current_user(state, headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    let project = session.open_project(project_name)?;
    Ok((session, project))
}

#[derive(Deserialize)]
struct TaskCreateRequest {
    description: String,
}

async fn add_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
    Json(req): Json<TaskCreateRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let (_session, project) = open_project_session(&state, &headers, &project_name).await?;
    let task = project
        .mission_log
        .lock()
        .await
        .add_task(&req.description, None)
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Deserialize)]
struct TaskUpdateRequest {
    description: String,
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((project_name, task_id)): Path<(String, i64)>,
    Json(req): Json<TaskUpdateRequest>,
) -> Result<StatusCode, ApiError> {
    let (_session, project) = open_project_session(&state, &headers, &project_name).await?;
    let updated = project
        .mission_log
        .lock()
        .await
        .update_task(task_id, &req.description)
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    if !updated {
        return Err(ApiError::NotFound(format!("Task with ID {} not found.", task_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((project_name, task_id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    let (_session, project) = open_project_session(&state, &headers, &project_name).await?;
    let deleted = project.mission_log.lock().await.delete_task(task_id).await;
    if !deleted {
        return Err(ApiError::NotFound(format!("Task with ID {} not found.", task_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct TasksReorderRequest {
    ordered_task_ids: Vec<i64>,
}

async fn reorder_tasks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
    Json(req): Json<TasksReorderRequest>,
) -> Result<StatusCode, ApiError> {
    let (_session, project) = open_project_session(&state, &headers, &project_name).await?;
    let reordered = project
        .mission_log
        .lock()
        .await
        .reorder(&req.ordered_task_ids)
        .await;
    if !reordered {
        return Err(ApiError::Validation(
            "Failed to reorder tasks. The provided list of IDs may be invalid or incomplete.".to_string(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}
