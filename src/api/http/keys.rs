// src/api/http/keys.rs
// Provider API key management. Keys are encrypted at rest and only ever
// shown back to the user in masked form.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use super::current_user;
use crate::api::ApiError;
use crate::db::crud;
use crate::state::AppState;

pub fn create_keys_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_or_update_key))
        .route("/", get(list_keys))
        .route("/{provider_name}", delete(delete_key))
}

/// Masks an API key for safe display, showing first and last few chars.
fn mask_api_key(key: &str) -> String {
    if key.is_empty() {
        return "ERROR_NO_KEY".to_string();
    }
    if key.len() < 8 {
        return "********".to_string();
    }
    match key.split_once('_') {
        Some((prefix, rest)) => {
            let suffix: String = rest.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("{}_...{}", prefix, suffix)
        }
        None => format!("{}...{}", &key[..4], &key[key.len() - 4..]),
    }
}

#[derive(Deserialize)]
struct ProviderKeyCreate {
    provider_name: String,
    api_key: String,
}

#[derive(Serialize)]
struct ProviderKeyView {
    provider_name: String,
    masked_key: String,
}

#[derive(Serialize)]
struct ProviderKeyList {
    keys: Vec<ProviderKeyView>,
}

async fn create_or_update_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ProviderKeyCreate>,
) -> Result<(StatusCode, Json<ProviderKeyView>), ApiError> {
    let user = current_user(&state, &headers).await?;
    let provider_name = req.provider_name.trim().to_lowercase();
    if provider_name.is_empty() {
        return Err(ApiError::Validation("Provider name cannot be empty.".to_string()));
    }

    crud::upsert_provider_key(
        &state.pool,
        user.id,
        &provider_name,
        &req.api_key,
        &state.config.encryption_key,
    )
    .await
    .map_err(ApiError::Internal)?;

    Ok((
        StatusCode::CREATED,
        Json(ProviderKeyView {
            provider_name,
            masked_key: mask_api_key(&req.api_key),
        }),
    ))
}

async fn list_keys(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ProviderKeyList>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let stored = crud::get_provider_keys_for_user(&state.pool, user.id)
        .await
        .map_err(ApiError::Internal)?;

    let mut keys = Vec::new();
    for key in stored {
        let decrypted = crud::get_decrypted_key_for_provider(
            &state.pool,
            user.id,
            &key.provider_name,
            &state.config.encryption_key,
        )
        .await
        .map_err(ApiError::Internal)?;
        if let Some(decrypted) = decrypted {
            keys.push(ProviderKeyView {
                provider_name: key.provider_name,
                masked_key: mask_api_key(&decrypted),
            });
        }
    }
    Ok(Json(ProviderKeyList { keys }))
}

async fn delete_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(provider_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&state, &headers).await?;
    let deleted = crud::delete_provider_key(&state.pool, user.id, &provider_name.trim().to_lowercase())
        .await
        .map_err(ApiError::Internal)?;
    if !deleted {
        return Err(ApiError::NotFound(format!(
            "API key for provider '{}' not found.",
            provider_name
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_never_reveals_the_middle() {
        assert_eq!(mask_api_key(""), "ERROR_NO_KEY");
        assert_eq!(mask_api_key("short"), "********");
        assert_eq!(mask_api_key("sk_live_abcdef123456"), "sk_...3456");
        let masked = mask_api_key("plainkey12345678");
        assert!(masked.starts_with("plai"));
        assert!(masked.ends_with("5678"));
        assert!(!masked.contains("key1234"));
    }
}
