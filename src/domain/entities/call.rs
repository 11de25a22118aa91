//! Call entity and repository trait.
//!
//! Stored in the `calls` document collection. Only signaling state lives
//! here; media never passes through the server.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::shared::ids;

/// Call media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Voice,
    Video,
}

/// Call lifecycle status.
///
/// ```text
/// Pending -> Ongoing | Declined | Canceled | Missed
/// Ongoing -> Accepted | Declined | Canceled | Missed
/// ```
///
/// `Accepted` is the terminal value of a call that was answered and then
/// hung up normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    Ongoing,
    Accepted,
    Declined,
    Canceled,
    Missed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ongoing => "ongoing",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Canceled => "canceled",
            Self::Missed => "missed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "ongoing" => Ok(Self::Ongoing),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            "missed" => Ok(Self::Missed),
            other => Err(AppError::bad_request(format!("Unknown call status '{}'", other))),
        }
    }

    /// Pending or Ongoing: the participants count as busy.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Ongoing)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        use CallStatus::*;
        matches!(
            (self, next),
            (Pending, Ongoing | Declined | Canceled | Missed)
                | (Ongoing, Accepted | Declined | Canceled | Missed)
        )
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A voice or video call between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: String,

    /// Caller first, recipient second
    pub participants: Vec<String>,

    #[serde(rename = "type")]
    pub call_type: CallType,

    pub status: CallStatus,

    /// Seconds between the supplied start and the end of the call
    pub duration_secs: Option<i64>,

    pub created_at: DateTime<Utc>,

    /// user id -> when the user removed the call from their log
    #[serde(default)]
    pub deleted: BTreeMap<String, DateTime<Utc>>,
}

impl Call {
    pub fn new(caller_id: &str, recipient_id: &str, call_type: CallType, status: CallStatus) -> Self {
        Self {
            id: ids::new_id(),
            participants: vec![caller_id.to_string(), recipient_id.to_string()],
            call_type,
            status,
            duration_secs: None,
            created_at: Utc::now(),
            deleted: BTreeMap::new(),
        }
    }

    pub fn caller_id(&self) -> &str {
        self.participants.first().map(String::as_str).unwrap_or_default()
    }

    pub fn recipient_id(&self) -> &str {
        self.participants.get(1).map(String::as_str).unwrap_or_default()
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// Participants other than `user_id`.
    pub fn others(&self, user_id: &str) -> Vec<String> {
        self.participants
            .iter()
            .filter(|p| p.as_str() != user_id)
            .cloned()
            .collect()
    }

    pub fn is_deleted_for(&self, user_id: &str) -> bool {
        self.deleted.contains_key(user_id)
    }
}

/// Repository trait for Call data access operations.
#[async_trait]
pub trait CallRepository: Send + Sync {
    /// Find a call by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Call>, AppError>;

    /// Every call `user_id` participates in.
    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Call>, AppError>;

    /// Pending or Ongoing calls `user_id` participates in.
    async fn find_active_by_participant(&self, user_id: &str) -> Result<Vec<Call>, AppError>;

    /// Insert a new call document.
    async fn create(&self, call: &Call) -> Result<Call, AppError>;

    /// Patch status and duration.
    async fn update_status(
        &self,
        id: &str,
        status: CallStatus,
        duration_secs: Option<i64>,
    ) -> Result<Call, AppError>;

    /// Add `user_id` to the per-user delete map if absent.
    async fn mark_deleted(&self, id: &str, user_id: &str, at: DateTime<Utc>) -> Result<Call, AppError>;
}
