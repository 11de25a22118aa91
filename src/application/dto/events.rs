//! Client Events
//!
//! Logical events the coordinators hand to the notification fan-out. The
//! transport serializes them as `{"event": <name>, "data": <payload>}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::response::GroupProfile;
use crate::domain::{Call, ChatType, Message};
use crate::shared::error::AppError;

/// WebRTC signaling payload, relayed unchanged between call participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalPayload {
    /// SDP offer
    Offer { sdp: String },
    /// SDP answer
    Answer { sdp: String },
    /// Trickled ICE candidate
    IceCandidate {
        candidate: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sdp_mid: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sdp_m_line_index: Option<u32>,
    },
}

/// Events pushed to live connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    PresenceChanged(PresenceChanged),

    MessageCreated(MessageEnvelope),
    MessageStatusChanged(MessageEnvelope),
    MessageDeleted(MessageEnvelope),

    ChatArchived(ArchiveChanged),
    ChatUnarchived(ArchiveChanged),

    GroupProfileChanged(GroupProfile),

    CallIncoming(Call),
    CallOutgoing(Call),
    CallAccepted(Call),
    CallEnded(Call),
    CallDeleted(CallDeleted),

    SignalRelayed(SignalRelayed),
}

impl ClientEvent {
    /// Get the event name for dispatch
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::PresenceChanged(_) => "presence-changed",
            ClientEvent::MessageCreated(_) => "message-created",
            ClientEvent::MessageStatusChanged(_) => "message-status-changed",
            ClientEvent::MessageDeleted(_) => "message-deleted",
            ClientEvent::ChatArchived(_) => "chat-archived",
            ClientEvent::ChatUnarchived(_) => "chat-unarchived",
            ClientEvent::GroupProfileChanged(_) => "group-profile-changed",
            ClientEvent::CallIncoming(_) => "call-incoming",
            ClientEvent::CallOutgoing(_) => "call-outgoing",
            ClientEvent::CallAccepted(_) => "call-accepted",
            ClientEvent::CallEnded(_) => "call-ended",
            ClientEvent::CallDeleted(_) => "call-deleted",
            ClientEvent::SignalRelayed(_) => "signal-relayed",
        }
    }

    /// Serialize the payload alone (the `data` part).
    pub fn payload(&self) -> Result<serde_json::Value, AppError> {
        let value = match self {
            ClientEvent::PresenceChanged(e) => serde_json::to_value(e)?,
            ClientEvent::MessageCreated(e)
            | ClientEvent::MessageStatusChanged(e)
            | ClientEvent::MessageDeleted(e) => serde_json::to_value(e)?,
            ClientEvent::ChatArchived(e) | ClientEvent::ChatUnarchived(e) => serde_json::to_value(e)?,
            ClientEvent::GroupProfileChanged(e) => serde_json::to_value(e)?,
            ClientEvent::CallIncoming(e)
            | ClientEvent::CallOutgoing(e)
            | ClientEvent::CallAccepted(e)
            | ClientEvent::CallEnded(e) => serde_json::to_value(e)?,
            ClientEvent::CallDeleted(e) => serde_json::to_value(e)?,
            ClientEvent::SignalRelayed(e) => serde_json::to_value(e)?,
        };
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceChanged {
    pub user_id: String,
    pub online: bool,
    /// When the user's last connection went away; `None` while online
    pub last_connection: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub chat_type: ChatType,
    pub chat_id: String,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveChanged {
    pub chat_id: String,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDeleted {
    pub call_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRelayed {
    pub call_id: String,
    pub from_user_id: String,
    pub signal: SignalPayload,
}
