// src/api/ws/mod.rs
// The authenticated command-deck WebSocket endpoint.

pub mod hub;
pub mod message;

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::verify_token;
use crate::db::crud;
use crate::state::AppState;
use hub::WsConnection;

const DEFAULT_CLIENT_ID: &str = "command_deck";
const POLICY_VIOLATION: u16 = 1008;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
    client_id: Option<String>,
}

/// `GET /ws/command_deck?token=...` - bearer token in the query string, close
/// code 1008 on any authentication failure.
pub async fn command_deck_ws(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, query: WsAuthQuery) {
    let user_id = match authenticate(&state, query.token.as_deref()).await {
        Ok(user_id) => user_id,
        Err(reason) => {
            warn!("WebSocket auth failed: {}", reason);
            close_with_policy_violation(socket, &reason).await;
            return;
        }
    };

    let client_id = query
        .client_id
        .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string());

    let (sender, mut receiver) = socket.split();
    let connection = Arc::new(WsConnection::new(sender));
    state.hub.connect(connection.clone(), user_id, &client_id).await;

    state
        .hub
        .send_to_client(
            &serde_json::json!({"type": "internal_ws_status", "content": "connected"}),
            user_id,
            &client_id,
        )
        .await;

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => {
                        // Client heartbeats are silently discarded.
                        if value.get("type").and_then(Value::as_str) == Some("ping") {
                            continue;
                        }
                        debug!("Received message from user {}: {}", user_id, text);
                    }
                    Err(_) => {
                        debug!("Received non-JSON message from user {}: {}", user_id, text);
                    }
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state
        .hub
        .disconnect_if_current(user_id, &client_id, &connection)
        .await;
    info!("User {} disconnected from WebSocket", user_id);
}

async fn authenticate(state: &AppState, token: Option<&str>) -> Result<i64, String> {
    let token = token.ok_or_else(|| "missing auth token".to_string())?;
    let claims =
        verify_token(&state.config, token).map_err(|_| "invalid or expired token".to_string())?;
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| "invalid token payload".to_string())?;
    match crud::get_user_by_id(&state.pool, user_id).await {
        Ok(Some(_)) => Ok(user_id),
        Ok(None) => Err("user not found".to_string()),
        Err(e) => Err(format!("user lookup failed: {}", e)),
    }
}

async fn close_with_policy_violation(mut socket: WebSocket, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: POLICY_VIOLATION,
            reason: Utf8Bytes::from(reason.to_string()),
        })))
        .await;
}
