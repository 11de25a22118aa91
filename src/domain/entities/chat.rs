//! Chat entity and repository trait.
//!
//! Stored in the `chats` document collection. An Individual chat lists its
//! two users; a Group chat lists a single id, the group it belongs to.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::shared::ids;

/// Chat types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    /// One-to-one conversation between two users
    Individual,
    /// Conversation backed by a Group entity
    Group,
}

impl ChatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "individual" => Ok(Self::Individual),
            "group" => Ok(Self::Group),
            other => Err(AppError::bad_request(format!("Unknown chat type '{}'", other))),
        }
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,

    #[serde(rename = "type")]
    pub chat_type: ChatType,

    /// User ids (Individual) or the group id (Group)
    pub participants: Vec<String>,

    pub created_at: DateTime<Utc>,

    /// user id -> when the user archived the chat
    #[serde(default)]
    pub archived: BTreeMap<String, DateTime<Utc>>,
}

impl Chat {
    /// New Individual chat between two users.
    pub fn individual(user_id: &str, recipient_id: &str) -> Self {
        Self {
            id: ids::new_id(),
            chat_type: ChatType::Individual,
            participants: vec![user_id.to_string(), recipient_id.to_string()],
            created_at: Utc::now(),
            archived: BTreeMap::new(),
        }
    }

    /// New Group chat pointing at `group_id`.
    pub fn for_group(group_id: &str) -> Self {
        Self {
            id: ids::new_id(),
            chat_type: ChatType::Group,
            participants: vec![group_id.to_string()],
            created_at: Utc::now(),
            archived: BTreeMap::new(),
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// True for the Individual chat of the unordered pair {a, b}.
    pub fn is_pair(&self, a: &str, b: &str) -> bool {
        self.chat_type == ChatType::Individual
            && self.participants.len() == 2
            && self.is_participant(a)
            && self.is_participant(b)
    }

    /// The participant that is not `user_id` in an Individual chat.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.as_str() != user_id)
            .map(String::as_str)
    }

    /// The group id a Group chat points at.
    pub fn group_id(&self) -> Option<&str> {
        match self.chat_type {
            ChatType::Group => self.participants.first().map(String::as_str),
            ChatType::Individual => None,
        }
    }

    pub fn is_archived_for(&self, user_id: &str) -> bool {
        self.archived.contains_key(user_id)
    }

    /// Participant set as a sorted list, for order-independent comparison.
    pub fn participant_set(&self) -> Vec<String> {
        let mut set = self.participants.clone();
        set.sort();
        set.dedup();
        set
    }
}

/// Repository trait for Chat data access operations.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find a chat by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Chat>, AppError>;

    /// Find the Individual chat of the unordered pair {a, b}.
    ///
    /// When racing creations left more than one, the earliest-created chat
    /// (ties broken by id) is returned so every caller converges on it.
    async fn find_individual(&self, a: &str, b: &str) -> Result<Option<Chat>, AppError>;

    /// Individual chats that list `user_id` as a participant.
    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Chat>, AppError>;

    /// The Group chat pointing at `group_id`.
    async fn find_by_group(&self, group_id: &str) -> Result<Option<Chat>, AppError>;

    /// Insert a new chat document.
    async fn create(&self, chat: &Chat) -> Result<Chat, AppError>;

    /// Set or clear one user's entry in the archive map.
    async fn set_archived(
        &self,
        chat_id: &str,
        user_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Chat, AppError>;
}

/// Pick the canonical chat among duplicates of the same pair.
pub fn earliest(chats: impl IntoIterator<Item = Chat>) -> Option<Chat> {
    chats
        .into_iter()
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}
