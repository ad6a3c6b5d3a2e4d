// src/api/http/auth.rs
// Registration (beta-key gated), login and identity endpoints.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use super::current_user;
use crate::api::ApiError;
use crate::auth::{create_token, password};
use crate::db::crud;
use crate::state::AppState;

pub fn create_auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(login))
        .route("/users/me", get(me))
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    beta_key: String,
}

#[derive(Serialize)]
struct UserResponse {
    id: i64,
    email: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if req.beta_key != state.config.beta_access_key {
        return Err(ApiError::Forbidden("Invalid Beta Key".to_string()));
    }
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".to_string()));
    }
    if crud::get_user_by_email(&state.pool, &req.email)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        return Err(ApiError::Validation("Email already registered".to_string()));
    }

    let hashed = password::hash_password(&req.password).map_err(ApiError::Internal)?;
    let user = crud::create_user(&state.pool, &req.email, &hashed)
        .await
        .map_err(ApiError::Internal)?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = crud::get_user_by_email(&state.pool, &req.email)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Auth("Incorrect email or password".to_string()))?;

    if !password::verify_password(&req.password, &user.hashed_password) {
        return Err(ApiError::Auth("Incorrect email or password".to_string()));
    }

    let access_token =
        create_token(&state.config, user.id, &user.email).map_err(ApiError::Internal)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let user = current_user(&state, &headers).await?;
    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
    }))
}
