// src/api/http/assignments.rs
// Per-role model assignments and the provider-filtered model catalog.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use super::current_user;
use crate::api::ApiError;
use crate::db::crud;
use crate::db::models::ModelAssignment;
use crate::state::AppState;

pub fn create_assignments_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_assignments))
        .route("/", post(update_assignments))
        .route("/available-models", get(available_models))
}

/// The models offered for each provider a user can configure.
fn models_to_display() -> HashMap<&'static str, Vec<&'static str>> {
    HashMap::from([
        ("openai", vec!["gpt-4o", "gpt-4-turbo", "gpt-5"]),
        (
            "google",
            vec!["gemini-1.5-pro-latest", "gemini-2.5-pro", "gemini-2.5-flash"],
        ),
        (
            "anthropic",
            vec!["claude-3.5-sonnet-20240620", "claude-3-opus-20240229"],
        ),
        ("deepseek", vec!["deepseek-chat", "deepseek-reasoner", "deepseek-coder"]),
    ])
}

#[derive(Serialize)]
struct AssignmentList {
    assignments: Vec<ModelAssignment>,
}

#[derive(Deserialize)]
struct AssignmentUpdate {
    assignments: Vec<ModelAssignment>,
}

#[derive(Serialize)]
struct AvailableModels {
    models: HashMap<String, Vec<String>>,
}

async fn get_assignments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AssignmentList>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let assignments = crud::get_assignments_for_user(&state.pool, user.id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(AssignmentList { assignments }))
}

async fn update_assignments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AssignmentUpdate>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&state, &headers).await?;
    for assignment in &req.assignments {
        if !assignment.model_id.contains('/') {
            return Err(ApiError::Validation(format!(
                "model_id '{}' must be of the form 'provider/model'",
                assignment.model_id
            )));
        }
    }
    crud::upsert_assignments_for_user(&state.pool, user.id, &req.assignments)
        .await
        .map_err(ApiError::Internal)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Models a user can actually assign, based on the provider keys they have
/// configured.
async fn available_models(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AvailableModels>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let configured: std::collections::HashSet<String> =
        crud::get_provider_keys_for_user(&state.pool, user.id)
            .await
            .map_err(ApiError::Internal)?
            .into_iter()
            .map(|key| key.provider_name)
            .collect();

    let models = models_to_display()
        .into_iter()
        .filter(|(provider, _)| configured.contains(*provider))
        .map(|(provider, models)| {
            (
                provider.to_string(),
                models.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();
    Ok(Json(AvailableModels { models }))
}
