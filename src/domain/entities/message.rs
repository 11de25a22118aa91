//! Message entity and repository trait.
//!
//! Stored in the `messages` document collection, keyed by message id and
//! scoped to a chat. Messages are never physically removed; deletion is a
//! per-user marker.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::shared::ids;

/// What the message content holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Plain text
    #[default]
    Text,
    /// URL of an uploaded image
    Image,
    /// URL of an uploaded audio clip
    Audio,
    /// URL of an uploaded video
    Video,
    /// URL of any other uploaded file
    File,
}

impl ContentKind {
    pub fn is_media(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Per-user status timestamps of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MessageStatus {
    /// Exactly one entry: the sender
    pub sent: BTreeMap<String, DateTime<Utc>>,

    #[serde(default)]
    pub delivered: BTreeMap<String, DateTime<Utc>>,

    #[serde(default)]
    pub read: BTreeMap<String, DateTime<Utc>>,
}

/// The status maps a recipient can add itself to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Delivered,
    Read,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a deletion applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteScope {
    /// Hide the message for the caller only
    #[serde(rename = "self")]
    Me,
    /// Hide the message for every participant
    Everyone,
}

impl DeleteScope {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "self" | "me" => Ok(Self::Me),
            "everyone" | "all" => Ok(Self::Everyone),
            other => Err(AppError::bad_request(format!("Unknown delete scope '{}'", other))),
        }
    }
}

/// A message in a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,

    pub chat_id: String,

    /// Text, or URL of uploaded media
    pub content: String,

    #[serde(default)]
    pub content_kind: ContentKind,

    pub status: MessageStatus,

    /// user id -> when the message was hidden for that user
    #[serde(default)]
    pub deleted: BTreeMap<String, DateTime<Utc>>,
}

impl Message {
    /// New message sent by `sender_id` at `at`.
    pub fn new(
        chat_id: &str,
        sender_id: &str,
        content: impl Into<String>,
        content_kind: ContentKind,
        at: DateTime<Utc>,
    ) -> Self {
        let mut sent = BTreeMap::new();
        sent.insert(sender_id.to_string(), at);

        Self {
            id: ids::new_id(),
            chat_id: chat_id.to_string(),
            content: content.into(),
            content_kind,
            status: MessageStatus {
                sent,
                ..Default::default()
            },
            deleted: BTreeMap::new(),
        }
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.status.sent.keys().next().map(String::as_str)
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.status.sent.values().next().copied()
    }

    pub fn status_map(&self, kind: StatusKind) -> &BTreeMap<String, DateTime<Utc>> {
        match kind {
            StatusKind::Delivered => &self.status.delivered,
            StatusKind::Read => &self.status.read,
        }
    }

    pub fn has_status(&self, kind: StatusKind, user_id: &str) -> bool {
        self.status_map(kind).contains_key(user_id)
    }

    /// Add `user_id` to a status map. Returns false when already present or
    /// when the message was never sent.
    pub fn mark(&mut self, kind: StatusKind, user_id: &str, at: DateTime<Utc>) -> bool {
        if self.status.sent.is_empty() || self.has_status(kind, user_id) {
            return false;
        }
        let map = match kind {
            StatusKind::Delivered => &mut self.status.delivered,
            StatusKind::Read => &mut self.status.read,
        };
        map.insert(user_id.to_string(), at);
        true
    }

    pub fn is_deleted_for(&self, user_id: &str) -> bool {
        self.deleted.contains_key(user_id)
    }

    /// Add deletion markers for users not yet present. Existing markers keep
    /// their original timestamp. Returns the ids that were added.
    pub fn mark_deleted<'a>(
        &mut self,
        user_ids: impl IntoIterator<Item = &'a String>,
        at: DateTime<Utc>,
    ) -> Vec<String> {
        let mut added = Vec::new();
        for user_id in user_ids {
            if !self.deleted.contains_key(user_id) {
                self.deleted.insert(user_id.clone(), at);
                added.push(user_id.clone());
            }
        }
        added
    }
}

/// Presentation order: Sent timestamp ascending, ties broken by id.
pub fn presentation_order(a: &Message, b: &Message) -> Ordering {
    a.sent_at()
        .cmp(&b.sent_at())
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort messages into presentation order.
pub fn sort_for_presentation(messages: &mut [Message]) {
    messages.sort_by(presentation_order);
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message of a chat by id.
    async fn find_by_id(&self, chat_id: &str, message_id: &str) -> Result<Option<Message>, AppError>;

    /// Every message of a chat, in no particular order.
    async fn find_by_chat(&self, chat_id: &str) -> Result<Vec<Message>, AppError>;

    /// Insert a new message document.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Add `{user_id: at}` to one status map if the key is absent.
    ///
    /// Returns the updated message, or `None` when the user was already
    /// present (the stored document is left untouched).
    async fn mark_status(
        &self,
        chat_id: &str,
        message_id: &str,
        kind: StatusKind,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Message>, AppError>;

    /// Add deletion markers for `user_ids`, never overwriting existing ones.
    async fn mark_deleted(
        &self,
        chat_id: &str,
        message_id: &str,
        user_ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<Message, AppError>;
}
