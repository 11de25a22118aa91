//! Group entity and repository trait.
//!
//! Stored in the `groups` document collection. The participant role map is
//! the live roster: users who left stay in it as `Former`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Role of a user in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Admin,
    Member,
    /// Left (or was removed); kept for history
    Former,
}

impl GroupRole {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Former)
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "former" => Ok(Self::Former),
            other => Err(AppError::bad_request(format!("Unknown group role '{}'", other))),
        }
    }
}

/// A group conversation's profile and roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,

    pub name: String,

    pub description: Option<String>,

    pub photo_url: Option<String>,

    /// user id -> role
    pub participants: BTreeMap<String, GroupRole>,

    pub creator_id: String,

    /// The Group chat wrapping this group
    pub chat_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn role_of(&self, user_id: &str) -> Option<GroupRole> {
        self.participants.get(user_id).copied()
    }

    /// Listed in the role map, whatever the role.
    pub fn is_listed(&self, user_id: &str) -> bool {
        self.participants.contains_key(user_id)
    }

    /// Listed with a non-Former role.
    pub fn is_active_participant(&self, user_id: &str) -> bool {
        self.role_of(user_id).is_some_and(|r| r.is_active())
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.role_of(user_id) == Some(GroupRole::Admin)
    }

    pub fn has_admin(&self) -> bool {
        self.participants.values().any(|r| *r == GroupRole::Admin)
    }

    /// Non-Former participants: the fan-out roster.
    pub fn active_participants(&self) -> Vec<String> {
        self.participants
            .iter()
            .filter(|(_, role)| role.is_active())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Every listed user, Former included.
    pub fn listed_participants(&self) -> Vec<String> {
        self.participants.keys().cloned().collect()
    }
}

/// Repository trait for Group data access operations.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Find a group by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Group>, AppError>;

    /// Groups whose role map lists `user_id` with any role.
    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Group>, AppError>;

    /// Insert a new group document.
    async fn create(&self, group: &Group) -> Result<Group, AppError>;

    /// Replace the group document.
    async fn update(&self, group: &Group) -> Result<Group, AppError>;
}
