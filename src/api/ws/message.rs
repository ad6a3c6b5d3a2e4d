// src/api/ws/message.rs
// Defines the data structures for messages pushed to connected clients.

use serde::{Deserialize, Serialize};

use crate::mission::log::Task;
use crate::workspace::FileNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Thinking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionLogPayload {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTaskPayload {
    pub task_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePathPayload {
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunkPayload {
    pub file_path: String,
    pub chunk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContentPayload {
    pub file_path: String,
    pub content: String,
}

/// Represents all server-originated messages. Every message carries a `type`
/// discriminator; payloads ride under `content` except for `agent_status`,
/// which carries a bare `status` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Mission begins / ends.
    AgentStatus { status: AgentStatus },

    /// Errors and informational user-facing notes.
    SystemLog { content: String },

    /// Companion chat and conductor narration.
    AuraResponse { content: String },

    /// Plan-assembly stage transitions.
    Phase { content: String },

    /// Emitted after any mission-log mutation, from the on-disk snapshot.
    MissionLogUpdated { content: MissionLogPayload },

    /// The conductor started a new task.
    ActiveTaskUpdated { content: ActiveTaskPayload },

    /// Per-token coder streaming.
    CodeStreamChunk { content: FileChunkPayload },

    /// Sent just before a `write_file` action runs.
    FileWritingPending { content: FilePathPayload },

    /// Sent after a successful file mutation.
    FileContentUpdated { content: FileContentPayload },

    /// Sent after any filesystem-mutating tool.
    FileTreeUpdated { content: FileNode },

    MissionSuccess,

    MissionFailure { content: String },

    /// Handshake acknowledgement on a fresh socket.
    InternalWsStatus { content: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_matches_protocol() {
        let msg = ServerMessage::AgentStatus {
            status: AgentStatus::Idle,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "agent_status");
        assert_eq!(json["status"], "idle");

        let msg = ServerMessage::ActiveTaskUpdated {
            content: ActiveTaskPayload { task_id: 3 },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "active_task_updated");
        assert_eq!(json["content"]["taskId"], 3);

        let msg = ServerMessage::CodeStreamChunk {
            content: FileChunkPayload {
                file_path: "src/main.py".into(),
                chunk: "print".into(),
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"]["filePath"], "src/main.py");

        let json = serde_json::to_value(ServerMessage::MissionSuccess).unwrap();
        assert_eq!(json, serde_json::json!({"type": "mission_success"}));
    }
}
