// src/llm/mod.rs
// Stateless bridge to the external LLM microservice. Streams line-delimited
// JSON envelopes, fanning chunks out to the owning user's sockets and
// honouring stop requests between reads.

pub mod roles;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::ws::hub::BroadcastHub;
use crate::api::ws::message::ServerMessage;
use crate::mission::MissionControl;
use roles::RoleMap;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing model or API key configuration for role '{role}'; set it in Settings")]
    ConfigMissing { role: String },

    #[error("LLM service failed with status {status}. Details: {detail}")]
    Http { status: u16, detail: String },

    #[error("could not connect to the LLM server at {url}: {detail}")]
    Connect { url: String, detail: String },

    #[error("operation was cancelled by the user")]
    Cancelled,

    #[error("LLM stream failed: {0}")]
    Stream(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One streaming invocation of the model microservice.
pub struct LlmRequest<'a> {
    pub role: &'a str,
    pub messages: Vec<ChatMessage>,
    pub is_json: bool,
    pub tools: Option<Value>,
    /// When set, `chunk` envelopes are re-broadcast to the user under this
    /// message type with a `{filePath, chunk}` payload.
    pub stream_as: Option<&'a str>,
    pub file_path: Option<&'a str>,
}

impl<'a> LlmRequest<'a> {
    pub fn new(role: &'a str, messages: Vec<ChatMessage>) -> Self {
        Self {
            role,
            messages,
            is_json: false,
            tools: None,
            stream_as: None,
            file_path: None,
        }
    }

    pub fn json(mut self) -> Self {
        self.is_json = true;
        self
    }

    pub fn stream_as(mut self, message_type: &'a str, file_path: &'a str) -> Self {
        self.stream_as = Some(message_type);
        self.file_path = Some(file_path);
        self
    }
}

pub struct LlmStreamer {
    client: reqwest::Client,
    server_url: String,
    hub: Arc<BroadcastHub>,
    control: Arc<MissionControl>,
}

impl LlmStreamer {
    pub fn new(server_url: String, hub: Arc<BroadcastHub>, control: Arc<MissionControl>) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_url,
            hub,
            control,
        }
    }

    /// Sends one request and drains the streamed reply, returning the final
    /// text. Chunk envelopes are re-broadcast per `stream_as`; every other
    /// envelope is forwarded to the user verbatim.
    pub async fn invoke(
        &self,
        user_id: i64,
        roles: &RoleMap,
        request: LlmRequest<'_>,
    ) -> Result<String, LlmError> {
        let binding = roles.resolve(request.role).ok_or(LlmError::ConfigMissing {
            role: request.role.to_string(),
        })?;
        let api_key = binding.api_key.clone().ok_or(LlmError::ConfigMissing {
            role: request.role.to_string(),
        })?;

        let payload = json!({
            "provider_name": binding.provider,
            "model_name": binding.model,
            "messages": request.messages,
            "temperature": binding.temperature,
            "is_json": request.is_json,
            "tools": request.tools,
        });

        let invoke_url = format!("{}/invoke", self.server_url);
        info!("Invoking LLM server at {} (role '{}')", invoke_url, request.role);

        let response = self
            .client
            .post(&invoke_url)
            .header("Content-Type", "application/json")
            .header("X-Provider-API-Key", api_key)
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                let err = LlmError::Connect {
                    url: self.server_url.clone(),
                    detail: e.to_string(),
                };
                error!("{}", err);
                err
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            error!("LLM server returned non-200 status {}: {}", status, detail);
            let err = LlmError::Http { status, detail };
            self.hub
                .broadcast_to_user(
                    &ServerMessage::SystemLog {
                        content: format!("Error from AI microservice: {}", err),
                    },
                    user_id,
                )
                .await;
            return Err(err);
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut final_reply = String::new();

        while let Some(chunk) = stream.next().await {
            if !self.control.is_running(user_id) {
                info!("Stop request observed during stream for user {}. Halting.", user_id);
                return Err(LlmError::Cancelled);
            }

            let bytes = chunk.map_err(|e| LlmError::Stream(e.to_string()))?;
            buffer.extend_from_slice(&bytes);

            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                self.handle_envelope(&line, user_id, &request, &mut final_reply)
                    .await;
            }
        }
        if !buffer.is_empty() {
            let line = std::mem::take(&mut buffer);
            self.handle_envelope(&line, user_id, &request, &mut final_reply)
                .await;
        }

        Ok(final_reply)
    }

    async fn handle_envelope(
        &self,
        line: &[u8],
        user_id: i64,
        request: &LlmRequest<'_>,
        final_reply: &mut String,
    ) {
        let trimmed = match std::str::from_utf8(line) {
            Ok(text) => text.trim(),
            Err(e) => {
                warn!("Dropping non-UTF8 stream line: {}", e);
                return;
            }
        };
        if trimmed.is_empty() {
            return;
        }
        let Ok(envelope) = serde_json::from_str::<Value>(trimmed) else {
            return;
        };

        let is_chunk = envelope.get("type").and_then(Value::as_str) == Some("chunk");
        if is_chunk && request.stream_as.is_some() {
            let forwarded = json!({
                "type": request.stream_as,
                "content": {
                    "filePath": request.file_path,
                    "chunk": envelope.get("content").and_then(Value::as_str).unwrap_or(""),
                },
            });
            self.hub.broadcast_value(&forwarded, user_id).await;
        } else {
            self.hub.broadcast_value(&envelope, user_id).await;
        }

        if let Some(reply) = envelope
            .get("final_response")
            .and_then(|r| r.get("reply"))
            .and_then(Value::as_str)
        {
            *final_reply = reply.to_string();
        }
    }
}
