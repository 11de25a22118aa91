//! Presence Service
//!
//! The connection registry coordinator: tracks each user's live connection
//! ids and the moment the last of them went away, and tells everyone else
//! when a user comes online or goes offline.

use std::sync::Arc;

use async_trait::async_trait;

use super::notification_service::NotificationFanout;
use crate::application::dto::{ClientEvent, Presence, PresenceChanged};
use crate::domain::{ConnectionRepository, Removal};
use crate::shared::error::AppError;

/// Presence service trait
#[async_trait]
pub trait PresenceService: Send + Sync {
    /// Register a live connection. Idempotent.
    async fn on_connect(&self, user_id: &str, connection_id: &str) -> Result<Presence, AppError>;

    /// Drop a live connection. Unknown connections are a no-op.
    async fn on_disconnect(&self, user_id: &str, connection_id: &str) -> Result<Presence, AppError>;

    /// Mark the user online regardless of socket state ("still active" ping).
    async fn reset_presence(&self, user_id: &str) -> Result<Presence, AppError>;

    /// Current presence of a user.
    async fn presence_of(&self, user_id: &str) -> Result<Presence, AppError>;
}

/// PresenceService implementation
pub struct PresenceServiceImpl {
    connections: Arc<dyn ConnectionRepository>,
    fanout: Arc<NotificationFanout>,
}

impl PresenceServiceImpl {
    pub fn new(connections: Arc<dyn ConnectionRepository>, fanout: Arc<NotificationFanout>) -> Self {
        Self { connections, fanout }
    }

    /// Tell every other online user about `user_id`'s presence.
    async fn broadcast(&self, user_id: &str, presence: Presence) {
        let targets: Vec<String> = match self.connections.online_user_ids().await {
            Ok(ids) => ids.into_iter().filter(|id| id != user_id).collect(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not list online users");
                return;
            }
        };

        let event = ClientEvent::PresenceChanged(PresenceChanged {
            user_id: user_id.to_string(),
            online: presence.online,
            last_connection: presence.last_connection,
        });
        self.fanout.publish(&targets, &event).await;
    }
}

#[async_trait]
impl PresenceService for PresenceServiceImpl {
    async fn on_connect(&self, user_id: &str, connection_id: &str) -> Result<Presence, AppError> {
        let was_online = self
            .connections
            .find(user_id)
            .await?
            .is_some_and(|entry| entry.is_online());

        let added = self.connections.add_connection(user_id, connection_id).await?;
        tracing::debug!(user_id = %user_id, connection_id = %connection_id, added, "Connection registered");

        let presence = Presence {
            online: true,
            last_connection: None,
        };
        if !was_online {
            tracing::info!(user_id = %user_id, "User online");
            self.broadcast(user_id, presence).await;
        }

        Ok(presence)
    }

    async fn on_disconnect(&self, user_id: &str, connection_id: &str) -> Result<Presence, AppError> {
        match self.connections.remove_connection(user_id, connection_id).await? {
            Removal::NotFound => {
                tracing::debug!(user_id = %user_id, connection_id = %connection_id, "Disconnect of unknown connection ignored");
                self.presence_of(user_id).await
            }
            Removal::Removed { remaining, .. } if remaining > 0 => {
                tracing::debug!(user_id = %user_id, remaining, "Connection removed");
                Ok(Presence {
                    online: true,
                    last_connection: None,
                })
            }
            Removal::Removed { last_disconnect, .. } => {
                let presence = Presence {
                    online: false,
                    last_connection: last_disconnect,
                };
                tracing::info!(user_id = %user_id, "User offline");
                self.broadcast(user_id, presence).await;
                Ok(presence)
            }
        }
    }

    async fn reset_presence(&self, user_id: &str) -> Result<Presence, AppError> {
        self.connections.set_last_disconnect(user_id, None).await?;

        let presence = Presence {
            online: true,
            last_connection: None,
        };
        self.broadcast(user_id, presence).await;
        Ok(presence)
    }

    async fn presence_of(&self, user_id: &str) -> Result<Presence, AppError> {
        let entry = self.connections.find(user_id).await?;
        Ok(Presence::from_entry(entry.as_ref()))
    }
}
