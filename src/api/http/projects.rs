// src/api/http/projects.rs
// Project CRUD and workspace file access.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::current_user;
use crate::api::ws::message::ServerMessage;
use crate::api::ApiError;
use crate::session::AgentSession;
use crate::state::AppState;
use crate::workspace::project::{file_tree, read_file, write_file, FileNode};

pub fn create_projects_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_projects))
        .route("/{project_name}", post(create_project))
        .route("/{project_name}", delete(delete_project))
        .route("/{project_name}/load", post(load_project))
        .route("/workspace/{project_name}/files", get(get_project_file_tree))
        .route("/workspace/{project_name}/file", get(get_file_content))
        .route("/workspace/{project_name}/file", post(write_file_content))
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    let projects = session.projects.list_projects().map_err(ApiError::Internal)?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = current_user(&state, &headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    let path = session
        .projects
        .new_project(&project_name)
        .map_err(|e| ApiError::Conflict(e.to_string()))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Project created successfully.",
            "project_path": path.to_string_lossy(),
        })),
    ))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&state, &headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    if session.projects.load_project(&project_name).is_none() {
        return Err(ApiError::NotFound(format!("Project '{}' not found.", project_name)));
    }
    session
        .projects
        .delete_project(&project_name)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Loads a project and kicks off the background index builds: the symbol
/// index always, the full semantic scan when the store is empty.
async fn load_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    let project = session.open_project(&project_name)?;

    let mut message = format!("Project '{}' loaded successfully.", project_name);
    if project.vector.count().await == 0 {
        message.push_str(" Initial project scan for AI context has been started in the background.");
        let state = state.clone();
        let name = project_name.clone();
        let user_id = user.id;
        tokio::spawn(async move {
            if let Err(e) = run_initial_index(state, user_id, name).await {
                error!("Background initial index failed: {:#}", e);
            }
        });
    }

    state
        .hub
        .broadcast_to_user(
            &ServerMessage::FileTreeUpdated {
                content: file_tree(&project.context.project_root),
            },
            user.id,
        )
        .await;

    Ok(Json(json!({ "message": message })))
}

async fn run_initial_index(
    state: Arc<AppState>,
    user_id: i64,
    project_name: String,
) -> anyhow::Result<()> {
    info!("BACKGROUND: Starting initial project index for {}", project_name);
    let session = AgentSession::build(state, user_id).await?;
    let project = session
        .open_project(&project_name)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    project.vector.reindex_project().await?;
    info!("BACKGROUND: Completed initial project index for {}", project_name);
    Ok(())
}

async fn get_project_file_tree(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
) -> Result<Json<FileNode>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    let root = session
        .projects
        .load_project(&project_name)
        .ok_or_else(|| ApiError::NotFound(format!("Project '{}' not found.", project_name)))?;
    Ok(Json(file_tree(&root)))
}

#[derive(Deserialize)]
struct FileQuery {
    path: String,
}

async fn get_file_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Json<Value>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    let root = session
        .projects
        .load_project(&project_name)
        .ok_or_else(|| ApiError::NotFound(format!("Project '{}' not found.", project_name)))?;

    let content = read_file(&root, &query.path)
        .map_err(|e| ApiError::Validation(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("File not found at path: '{}'.", query.path)))?;
    Ok(Json(json!({ "content": content })))
}

#[derive(Deserialize)]
struct FileWriteRequest {
    path: String,
    content: String,
}

/// Writes a workspace file and refreshes both indices in the background.
async fn write_file_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(project_name): Path<String>,
    Json(req): Json<FileWriteRequest>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&state, &headers).await?;
    let session = AgentSession::build(state.clone(), user.id)
        .await
        .map_err(ApiError::Internal)?;
    let root = session
        .projects
        .load_project(&project_name)
        .ok_or_else(|| ApiError::NotFound(format!("Project '{}' not found.", project_name)))?;

    write_file(&root, &req.path, &req.content)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let state = state.clone();
    let user_id = user.id;
    tokio::spawn(async move {
        if let Err(e) = run_reindex(state, user_id, project_name, req.path, req.content).await {
            error!("Background re-indexing failed: {:#}", e);
        }
    });

    Ok(StatusCode::NO_CONTENT)
}

async fn run_reindex(
    state: Arc<AppState>,
    user_id: i64,
    project_name: String,
    relative_path: String,
    content: String,
) -> anyhow::Result<()> {
    let session = AgentSession::build(state, user_id).await?;
    let project = session
        .open_project(&project_name)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let absolute = crate::workspace::resolve_in_project(&project.context.project_root, &relative_path)?;
    project.vector.reindex_file(&absolute, &content).await?;
    project.symbols.write().update_file(&relative_path, &content);
    Ok(())
}
