use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Kind of conversation a peer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ChatType {
    /// One-to-one chat with a friend.
    Private,
    /// Group chat.
    Group,
    /// Temporary session with a non-friend.
    Temp,
}

impl From<ChatType> for u8 {
    fn from(value: ChatType) -> Self {
        match value {
            ChatType::Private => 1,
            ChatType::Group => 2,
            ChatType::Temp => 3,
        }
    }
}

impl TryFrom<u8> for ChatType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Private),
            2 => Ok(Self::Group),
            3 => Ok(Self::Temp),
            other => Err(format!("unknown chat type {other}")),
        }
    }
}

impl ChatType {
    const fn private() -> Self {
        Self::Private
    }

    /// Short label used in export file names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
            Self::Temp => "temp",
        }
    }
}

/// A missing or null chat type means a private chat.
fn chat_type_or_private<'de, D>(deserializer: D) -> Result<ChatType, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u8>::deserialize(deserializer)? {
        Some(value) => ChatType::try_from(value).map_err(serde::de::Error::custom),
        None => Ok(ChatType::Private),
    }
}

/// Conversation target: chat type plus the peer's uid or group code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    #[serde(default = "ChatType::private", deserialize_with = "chat_type_or_private")]
    pub chat_type: ChatType,
    #[serde(deserialize_with = "super::string_or_number")]
    pub peer_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

impl Peer {
    pub fn new(chat_type: ChatType, peer_uid: impl Into<String>) -> Self {
        Self {
            chat_type,
            peer_uid: peer_uid.into(),
            guild_id: None,
        }
    }

    pub fn group(group_code: impl Into<String>) -> Self {
        Self::new(ChatType::Group, group_code)
    }

    pub fn private(uid: impl Into<String>) -> Self {
        Self::new(ChatType::Private, uid)
    }
}

/// Lifecycle state of a server-side export task.
///
/// Unknown status strings decode as [`TaskStatus::Pending`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Whether the task can no longer change state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "paused" => Self::Paused,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Read-only snapshot of an export task as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TaskWire")]
pub struct ExportTask {
    pub id: String,
    pub peer: Option<Peer>,
    pub session_name: Option<String>,
    pub status: TaskStatus,
    /// Percentage in `[0, 100]`.
    pub progress: f64,
    pub format: Option<String>,
    pub message_count: u64,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub download_url: Option<String>,
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
}

/// Task as sent by the service: the id may arrive under any of three
/// keys, and numeric fields may be null.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskWire {
    id: Option<Value>,
    task_id: Option<Value>,
    #[serde(rename = "task_id")]
    task_id_snake: Option<Value>,
    peer: Option<Peer>,
    session_name: Option<String>,
    status: Option<TaskStatus>,
    progress: Option<f64>,
    format: Option<String>,
    message_count: Option<u64>,
    file_name: Option<String>,
    file_path: Option<String>,
    download_url: Option<String>,
    created_at: Option<String>,
    completed_at: Option<String>,
    error: Option<String>,
}

fn id_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<TaskWire> for ExportTask {
    fn from(wire: TaskWire) -> Self {
        let id = id_text(wire.id)
            .or_else(|| id_text(wire.task_id))
            .or_else(|| id_text(wire.task_id_snake))
            .unwrap_or_default();
        Self {
            id,
            peer: wire.peer,
            session_name: wire.session_name,
            status: wire.status.unwrap_or_default(),
            progress: wire.progress.unwrap_or(0.0),
            format: wire.format,
            message_count: wire.message_count.unwrap_or(0),
            file_name: wire.file_name,
            file_path: wire.file_path,
            download_url: wire.download_url,
            created_at: wire.created_at,
            completed_at: wire.completed_at,
            error: wire.error,
        }
    }
}

impl ExportTask {
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_decodes_camel_case_and_task_id_alias() {
        let task: ExportTask = serde_json::from_value(json!({
            "taskId": "export_1",
            "peer": {"chatType": 2, "peerUid": 123456},
            "status": "running",
            "progress": 40,
            "messageCount": 1200,
            "fileName": "group_123456.html"
        }))
        .unwrap();

        assert_eq!(task.id, "export_1");
        assert_eq!(task.status, TaskStatus::Running);
        assert!((task.progress - 40.0).abs() < f64::EPSILON);
        assert_eq!(task.message_count, 1200);
        assert_eq!(task.peer, Some(Peer::group("123456")));
        assert_eq!(task.file_name.as_deref(), Some("group_123456.html"));
    }

    #[test]
    fn test_unknown_status_falls_back_to_pending() {
        let task: ExportTask =
            serde_json::from_value(json!({"id": "t", "status": "queued"})).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_task_with_both_id_keys_and_null_numbers() {
        let task: ExportTask = serde_json::from_value(json!({
            "id": "x",
            "taskId": "y",
            "progress": null,
            "messageCount": null,
            "status": null
        }))
        .unwrap();
        assert_eq!(task.id, "x");
        assert!(task.progress.abs() < f64::EPSILON);
        assert_eq!(task.message_count, 0);
        assert_eq!(task.status, TaskStatus::Pending);

        let task: ExportTask =
            serde_json::from_value(json!({"id": "", "task_id": 77})).unwrap();
        assert_eq!(task.id, "77");
    }

    #[test]
    fn test_peer_without_chat_type_is_private() {
        let task: ExportTask = serde_json::from_value(json!({
            "taskId": "t",
            "peer": {"peerUid": "u_1", "chatType": null}
        }))
        .unwrap();
        assert_eq!(task.peer, Some(Peer::private("u_1")));

        let peer: Peer = serde_json::from_value(json!({"peerUid": "u_2"})).unwrap();
        assert_eq!(peer.chat_type, ChatType::Private);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Paused.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_chat_type_serializes_as_integer() {
        let peer = Peer::private("u_abc");
        assert_eq!(
            serde_json::to_value(&peer).unwrap(),
            json!({"chatType": 1, "peerUid": "u_abc"})
        );
        assert!(serde_json::from_value::<ChatType>(json!(9)).is_err());
    }
}
