// src/api/http/mod.rs

pub mod agent;
pub mod assignments;
pub mod auth;
pub mod keys;
pub mod missions;
pub mod projects;
pub mod router;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::api::ApiError;
use crate::auth::verify_token;
use crate::db::crud;
use crate::db::models::User;
use crate::state::AppState;

/// Resolves the authenticated user from the `Authorization: Bearer` header.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Auth("Could not validate credentials".to_string()))?;

    let claims = verify_token(&state.config, token)
        .map_err(|_| ApiError::Auth("Could not validate credentials".to_string()))?;
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::Auth("Could not validate credentials".to_string()))?;

    crud::get_user_by_id(&state.pool, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Auth("Could not validate credentials".to_string()))
}
