//! Response DTOs
//!
//! Structured results of coordinator operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Chat, ChatType, ConnectionEntry, GroupRole, Message, User, UserSettings};

/// Online state derived from a connection registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Presence {
    pub online: bool,
    pub last_connection: Option<DateTime<Utc>>,
}

impl Presence {
    /// Users never seen by the registry count as offline with no timestamp.
    pub fn from_entry(entry: Option<&ConnectionEntry>) -> Self {
        match entry {
            Some(entry) => Self {
                online: entry.is_online(),
                last_connection: entry.last_disconnect,
            },
            None => Self::default(),
        }
    }
}

/// Result of a message operation, with the users the change fans out to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageOutcome {
    pub chat_type: ChatType,
    pub chat_id: String,
    pub message: Message,
    pub recipients: Vec<String>,
}

/// Who a chat talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    User { user_id: String },
    Group { group_id: String },
}

/// Result of get-or-create for an Individual chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualChat {
    pub chat: Chat,
    /// False when an existing chat was returned
    pub created: bool,
}

/// A chat as one user sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSummary {
    pub chat: Chat,
    pub recipient: Recipient,
    pub archived: bool,
    /// Messages not deleted for this user, in presentation order
    pub messages: Vec<Message>,
}

/// Result of clearing a chat for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    pub chat_id: String,
    /// Messages newly hidden by this call
    pub cleared: usize,
}

/// A group participant joined with their user profile and presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    pub user_id: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub role: GroupRole,
    pub online: bool,
    pub last_connection: Option<DateTime<Utc>>,
}

/// Materialized group profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupProfile {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub creator_id: String,
    pub chat_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<ParticipantProfile>,
}

impl GroupProfile {
    pub fn participant(&self, user_id: &str) -> Option<&ParticipantProfile> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn admins(&self) -> Vec<&str> {
        self.participants
            .iter()
            .filter(|p| p.role == GroupRole::Admin)
            .map(|p| p.user_id.as_str())
            .collect()
    }
}

/// User profile with presence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub biography: Option<String>,
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,
    pub created_at: DateTime<Utc>,
    pub online: bool,
    pub last_connection: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Private fields (email, settings) are only included for the owner.
    pub fn from_user(user: User, presence: Presence, include_private: bool) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            email: include_private.then_some(user.email),
            phone: user.phone,
            biography: user.biography,
            photo_url: user.photo_url,
            settings: include_private.then_some(user.settings),
            created_at: user.created_at,
            online: presence.online,
            last_connection: presence.last_connection,
        }
    }
}

/// Result of relaying a signaling payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayOutcome {
    /// Connections the payload reached
    pub delivered: usize,
}
