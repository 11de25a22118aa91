//! WebSocket Message Types
//!
//! Frames exchanged on the gateway socket.
//!
//! Inbound: `{"id": "...", "action": "send-message", "data": {...}}`.
//! Outbound: `hello` once after the upgrade, `ok`/`error` replies to the
//! acting connection only, `event` frames pushed by the fan-out, and
//! `heartbeat_ack`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::application::dto::request::{
    CallRefRequest, ChatRefRequest, CreateGroupRequest, DeleteMessageRequest, EditGroupRequest,
    EndCallRequest, GroupRefRequest, MessageRefRequest, OpenChatRequest, RelaySignalRequest,
    SendMessageRequest, StartCallRequest, TypedChatRequest, UserRefRequest,
};
use crate::shared::error::{AppError, ErrorKind};

/// Raw inbound frame
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    /// Correlation id echoed in the reply
    #[serde(default)]
    pub id: Option<Value>,
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// Client actions, one per coordinator operation.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "kebab-case")]
pub enum Action {
    Heartbeat,

    GetUser(UserRefRequest),
    ResetPresence,

    OpenChat(OpenChatRequest),
    ListChats,
    ClearChat(TypedChatRequest),
    ArchiveChat(ChatRefRequest),
    UnarchiveChat(ChatRefRequest),
    ResolveRecipient(TypedChatRequest),

    SendMessage(SendMessageRequest),
    MarkDelivered(MessageRefRequest),
    MarkRead(MessageRefRequest),
    DeleteMessage(DeleteMessageRequest),
    ListMessages(ChatRefRequest),

    CreateGroup(CreateGroupRequest),
    EditGroup(EditGroupRequest),
    LeaveGroup(GroupRefRequest),
    GetGroup(GroupRefRequest),
    ListGroups,

    StartCall(StartCallRequest),
    AcceptCall(CallRefRequest),
    EndCall(EndCallRequest),
    DeleteCall(CallRefRequest),
    RelaySignal(RelaySignalRequest),
    CallLog,
}

impl Action {
    /// Decode the action named by a frame. Unknown actions and malformed
    /// payloads are `BadRequest`.
    pub fn from_frame(frame: &ClientFrame) -> Result<Self, AppError> {
        // Unit variants reject a `data` key, so drop an empty one.
        let empty = frame.data.is_null() || frame.data.as_object().is_some_and(|o| o.is_empty());
        let tagged = if empty {
            json!({ "action": frame.action })
        } else {
            json!({ "action": frame.action, "data": frame.data })
        };

        serde_json::from_value(tagged)
            .map_err(|e| AppError::bad_request(format!("Invalid '{}' frame: {}", frame.action, e)))
    }

    /// Stable action name for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Action::Heartbeat => "heartbeat",
            Action::GetUser(_) => "get-user",
            Action::ResetPresence => "reset-presence",
            Action::OpenChat(_) => "open-chat",
            Action::ListChats => "list-chats",
            Action::ClearChat(_) => "clear-chat",
            Action::ArchiveChat(_) => "archive-chat",
            Action::UnarchiveChat(_) => "unarchive-chat",
            Action::ResolveRecipient(_) => "resolve-recipient",
            Action::SendMessage(_) => "send-message",
            Action::MarkDelivered(_) => "mark-delivered",
            Action::MarkRead(_) => "mark-read",
            Action::DeleteMessage(_) => "delete-message",
            Action::ListMessages(_) => "list-messages",
            Action::CreateGroup(_) => "create-group",
            Action::EditGroup(_) => "edit-group",
            Action::LeaveGroup(_) => "leave-group",
            Action::GetGroup(_) => "get-group",
            Action::ListGroups => "list-groups",
            Action::StartCall(_) => "start-call",
            Action::AcceptCall(_) => "accept-call",
            Action::EndCall(_) => "end-call",
            Action::DeleteCall(_) => "delete-call",
            Action::RelaySignal(_) => "relay-signal",
            Action::CallLog => "call-log",
        }
    }
}

/// Outbound frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Hello {
        connection_id: String,
        user_id: String,
        heartbeat_interval: u64,
    },
    HeartbeatAck,
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        data: Value,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        kind: ErrorKind,
        code: u16,
        message: String,
    },
    Event {
        event: String,
        data: Value,
    },
}

impl ServerFrame {
    pub fn error(id: Option<Value>, err: &AppError) -> Self {
        let kind = err.kind();
        ServerFrame::Error {
            id,
            kind,
            code: kind.code(),
            message: err.public_message(),
        }
    }
}
