//! Request DTOs
//!
//! Data structures for inbound request bodies and WebSocket action payloads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use super::events::SignalPayload;
use crate::domain::{CallStatus, CallType, ContentKind, GroupRole, Theme};

/// Maximum message content length in characters
pub const MAX_MESSAGE_LENGTH: u64 = 4000;

/// Group photo supplied with a create or edit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoRef {
    /// Keep pointing at an already uploaded image
    Url(String),
    /// Raw image bytes to upload to the blob store
    Upload(Vec<u8>),
}

/// Sign-in request
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1, message = "ID token is required"))]
    pub id_token: String,
}

/// Update own profile request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 64, message = "Display name must be 1-64 characters"))]
    pub display_name: Option<String>,

    #[validate(length(max = 280, message = "Biography must be at most 280 characters"))]
    pub biography: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,
}

/// Update own settings request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    pub theme: Option<Theme>,

    #[validate(length(max = 512, message = "Chat background must be at most 512 characters"))]
    pub chat_background: Option<String>,
}

/// User search query
#[derive(Debug, Deserialize, Validate)]
pub struct SearchUsersQuery {
    #[validate(length(min = 1, max = 64, message = "Query must be 1-64 characters"))]
    pub q: String,

    #[validate(range(min = 1, max = 50, message = "Limit must be 1-50"))]
    pub limit: Option<usize>,
}

/// Reference to another user
#[derive(Debug, Deserialize, Validate)]
pub struct UserRefRequest {
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
}

/// Open (get or create) an Individual chat
#[derive(Debug, Deserialize, Validate)]
pub struct OpenChatRequest {
    #[validate(length(min = 1, message = "Recipient is required"))]
    pub recipient_id: String,
}

/// Reference to a chat
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRefRequest {
    #[validate(length(min = 1, message = "Chat id is required"))]
    pub chat_id: String,
}

/// Reference to a chat together with the type the client believes it has
#[derive(Debug, Deserialize, Validate)]
pub struct TypedChatRequest {
    pub chat_type: String,

    #[validate(length(min = 1, message = "Chat id is required"))]
    pub chat_id: String,
}

/// Send message request
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, message = "Chat id is required"))]
    pub chat_id: String,

    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,

    #[serde(default)]
    pub content_kind: ContentKind,
}

/// Reference to a message
#[derive(Debug, Deserialize, Validate)]
pub struct MessageRefRequest {
    #[validate(length(min = 1, message = "Chat id is required"))]
    pub chat_id: String,

    #[validate(length(min = 1, message = "Message id is required"))]
    pub message_id: String,
}

/// Delete message request; scope is "self" or "everyone"
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteMessageRequest {
    #[validate(length(min = 1, message = "Chat id is required"))]
    pub chat_id: String,

    #[validate(length(min = 1, message = "Message id is required"))]
    pub message_id: String,

    pub scope: String,
}

/// Create group request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub photo: Option<PhotoRef>,

    #[serde(default)]
    pub participants: BTreeMap<String, GroupRole>,
}

/// Edit group request
#[derive(Debug, Deserialize, Validate)]
pub struct EditGroupRequest {
    #[validate(length(min = 1, message = "Group id is required"))]
    pub group_id: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub photo: Option<PhotoRef>,

    pub participants: BTreeMap<String, GroupRole>,
}

/// Reference to a group
#[derive(Debug, Deserialize, Validate)]
pub struct GroupRefRequest {
    #[validate(length(min = 1, message = "Group id is required"))]
    pub group_id: String,
}

/// Start call request
#[derive(Debug, Deserialize, Validate)]
pub struct StartCallRequest {
    #[validate(length(min = 1, message = "Recipient is required"))]
    pub recipient_id: String,

    pub call_type: CallType,
}

/// Reference to a call
#[derive(Debug, Deserialize, Validate)]
pub struct CallRefRequest {
    #[validate(length(min = 1, message = "Call id is required"))]
    pub call_id: String,
}

/// End call request
#[derive(Debug, Deserialize, Validate)]
pub struct EndCallRequest {
    #[validate(length(min = 1, message = "Call id is required"))]
    pub call_id: String,

    /// Terminal status chosen by the ending party
    pub status: CallStatus,

    /// When media started flowing; absent for calls that never connected
    pub started_at: Option<DateTime<Utc>>,
}

/// Relay a signaling payload to the other call participant
#[derive(Debug, Deserialize, Validate)]
pub struct RelaySignalRequest {
    #[validate(length(min = 1, message = "Call id is required"))]
    pub call_id: String,

    pub signal: SignalPayload,
}
