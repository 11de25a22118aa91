//! Connection registry entry and repository trait.
//!
//! One entry per user: the set of live connection ids (one per device or
//! session) and the moment the last of them went away.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Live connections of one user.
///
/// `last_disconnect` is `None` while at least one connection is live. The
/// explicit presence reset may also clear it without a live socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConnectionEntry {
    pub user_id: String,

    pub connection_ids: BTreeSet<String>,

    pub last_disconnect: Option<DateTime<Utc>>,
}

impl ConnectionEntry {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Add a connection; returns false when it was already registered.
    pub fn add(&mut self, connection_id: &str) -> bool {
        self.last_disconnect = None;
        self.connection_ids.insert(connection_id.to_string())
    }

    /// Remove a connection; returns false when it was not registered.
    /// Stamps `at` as last disconnect when the set becomes empty.
    pub fn remove(&mut self, connection_id: &str, at: DateTime<Utc>) -> bool {
        let removed = self.connection_ids.remove(connection_id);
        if removed && self.connection_ids.is_empty() {
            self.last_disconnect = Some(at);
        }
        removed
    }

    pub fn is_connected(&self) -> bool {
        !self.connection_ids.is_empty()
    }

    /// Online as far as clients are concerned: no disconnect marker.
    pub fn is_online(&self) -> bool {
        self.last_disconnect.is_none()
    }
}

/// Outcome of removing a connection from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The connection was not registered for this user
    NotFound,
    /// Removed; this many connections remain. `last_disconnect` is the
    /// marker stamped in the same step when none remain.
    Removed {
        remaining: usize,
        last_disconnect: Option<DateTime<Utc>>,
    },
}

/// Repository trait for the connection registry.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Fetch the registry entry of a user, if one was ever created.
    async fn find(&self, user_id: &str) -> Result<Option<ConnectionEntry>, AppError>;

    /// Idempotently add a connection and clear the disconnect marker.
    /// Returns true when the connection was not registered before.
    async fn add_connection(&self, user_id: &str, connection_id: &str) -> Result<bool, AppError>;

    /// Remove a connection if present. When the set becomes empty the
    /// disconnect marker is stamped atomically with the removal.
    async fn remove_connection(&self, user_id: &str, connection_id: &str) -> Result<Removal, AppError>;

    /// Overwrite the last-disconnect marker (`None` means online).
    async fn set_last_disconnect(
        &self,
        user_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;

    /// Live connection ids of a user. Empty when unknown.
    async fn connection_ids(&self, user_id: &str) -> Result<Vec<String>, AppError>;

    /// Users that currently hold at least one live connection.
    async fn online_user_ids(&self) -> Result<Vec<String>, AppError>;
}
