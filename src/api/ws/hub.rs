// src/api/ws/hub.rs
// Fan-out of server-originated messages to every open client session of a
// user. The map is two-level: user_id -> client_id -> connection.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::message::ServerMessage;

/// Manages the state and sending logic for a single WebSocket connection.
pub struct WsConnection {
    sender: Mutex<SplitSink<WebSocket, Message>>,
    is_closed: Mutex<bool>,
}

impl WsConnection {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sender: Mutex::new(sender),
            is_closed: Mutex::new(false),
        }
    }

    async fn mark_closed(&self) {
        *self.is_closed.lock().await = true;
    }

    pub async fn is_closed(&self) -> bool {
        *self.is_closed.lock().await
    }

    /// Sends one JSON payload with immediate flushing. Marks the connection
    /// closed on the first failure so later sends become no-ops.
    pub async fn send_json(&self, payload: &Value) -> Result<(), ()> {
        if self.is_closed().await {
            return Err(());
        }
        let text = payload.to_string();
        let mut sender = self.sender.lock().await;
        if let Err(e) = sender.send(Message::Text(Utf8Bytes::from(text))).await {
            warn!("WebSocket send failed (connection likely closed): {}", e);
            drop(sender);
            self.mark_closed().await;
            return Err(());
        }
        if let Err(e) = sender.flush().await {
            warn!("WebSocket flush failed (connection likely closed): {}", e);
            drop(sender);
            self.mark_closed().await;
            return Err(());
        }
        Ok(())
    }

    async fn close_going_away(&self) {
        let mut sender = self.sender.lock().await;
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: 1001,
                reason: Utf8Bytes::from("New connection established"),
            })))
            .await;
        drop(sender);
        self.mark_closed().await;
    }
}

/// Process-wide registry of live client sockets, keyed by `(user, client)`.
#[derive(Default)]
pub struct BroadcastHub {
    connections: RwLock<HashMap<i64, HashMap<String, Arc<WsConnection>>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a connection for `(user, client)`. An existing socket under the
    /// same tuple is closed with "going away" first, so at most one socket is
    /// ever live per tuple.
    pub async fn connect(&self, connection: Arc<WsConnection>, user_id: i64, client_id: &str) {
        let previous = {
            let mut map = self.connections.write().await;
            map.entry(user_id)
                .or_default()
                .insert(client_id.to_string(), connection)
        };
        if let Some(old) = previous {
            old.close_going_away().await;
        }
        info!("WebSocket connected: user {}, client '{}'", user_id, client_id);
    }

    /// Removes a connection and prunes the user entry when it becomes empty.
    pub async fn disconnect(&self, user_id: i64, client_id: &str) {
        let mut map = self.connections.write().await;
        if let Some(clients) = map.get_mut(&user_id) {
            clients.remove(client_id);
            if clients.is_empty() {
                map.remove(&user_id);
            }
            info!("WebSocket disconnected: user {}, client '{}'", user_id, client_id);
        }
    }

    /// Removes the binding only if `connection` is still the one registered
    /// under `(user, client)`. A socket that was replaced by a newer one must
    /// not unbind its successor when its reader loop winds down.
    pub async fn disconnect_if_current(
        &self,
        user_id: i64,
        client_id: &str,
        connection: &Arc<WsConnection>,
    ) {
        let mut map = self.connections.write().await;
        let Some(clients) = map.get_mut(&user_id) else {
            return;
        };
        let is_current = clients
            .get(client_id)
            .map(|current| Arc::ptr_eq(current, connection))
            .unwrap_or(false);
        if is_current {
            clients.remove(client_id);
            if clients.is_empty() {
                map.remove(&user_id);
            }
            info!("WebSocket disconnected: user {}, client '{}'", user_id, client_id);
        }
    }

    pub async fn client_count(&self, user_id: i64) -> usize {
        self.connections
            .read()
            .await
            .get(&user_id)
            .map(|clients| clients.len())
            .unwrap_or(0)
    }

    /// Sends a JSON payload to one specific client window of a user.
    /// A failed send disconnects that socket only.
    pub async fn send_to_client(&self, payload: &Value, user_id: i64, client_id: &str) {
        let connection = {
            let map = self.connections.read().await;
            map.get(&user_id).and_then(|clients| clients.get(client_id)).cloned()
        };
        if let Some(connection) = connection {
            if connection.send_json(payload).await.is_err() {
                self.disconnect_if_current(user_id, client_id, &connection).await;
            }
        }
    }

    /// Sends a raw JSON payload to every open session of a user. Per-socket
    /// failures are isolated; failed sockets are pruned.
    pub async fn broadcast_value(&self, payload: &Value, user_id: i64) {
        let targets: Vec<(String, Arc<WsConnection>)> = {
            let map = self.connections.read().await;
            match map.get(&user_id) {
                Some(clients) => clients
                    .iter()
                    .map(|(id, conn)| (id.clone(), conn.clone()))
                    .collect(),
                None => return,
            }
        };

        let sends = targets.iter().map(|(client_id, connection)| {
            let payload = payload.clone();
            async move {
                let failed = connection.send_json(&payload).await.is_err();
                (client_id, connection, failed)
            }
        });
        let results = futures_util::future::join_all(sends).await;
        for (client_id, connection, failed) in results {
            if failed {
                self.disconnect_if_current(user_id, client_id, connection).await;
            }
        }
    }

    /// Typed variant of [`broadcast_value`].
    pub async fn broadcast_to_user(&self, message: &ServerMessage, user_id: i64) {
        match serde_json::to_value(message) {
            Ok(payload) => self.broadcast_value(&payload, user_id).await,
            Err(e) => debug!("Failed to serialize broadcast message: {}", e),
        }
    }
}
