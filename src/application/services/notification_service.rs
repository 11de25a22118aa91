//! Notification Fan-out
//!
//! Delivers a logical event to every live connection of one or more users.
//! Users without live connections are skipped: nothing is queued, and a
//! reconnecting client re-reads current state instead of replaying events.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::application::dto::ClientEvent;
use crate::domain::{ConnectionRepository, FanoutTransport};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Counts of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Distinct target users
    pub targets: usize,
    /// Connections the event was handed to
    pub delivered: usize,
    /// Connections listed in the registry that the transport no longer holds
    pub skipped: usize,
}

/// User-scoped fan-out over the connection registry.
pub struct NotificationFanout {
    connections: Arc<dyn ConnectionRepository>,
    transport: Arc<dyn FanoutTransport>,
}

impl NotificationFanout {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        transport: Arc<dyn FanoutTransport>,
    ) -> Self {
        Self {
            connections,
            transport,
        }
    }

    /// Push `event` to every live connection of each target user.
    ///
    /// Duplicate targets are delivered to once.
    pub async fn notify(
        &self,
        targets: &[String],
        event: &ClientEvent,
    ) -> Result<FanoutReport, AppError> {
        let event_name = event.event_name();
        let payload = event.payload()?;

        let unique: BTreeSet<&String> = targets.iter().collect();
        let mut report = FanoutReport {
            targets: unique.len(),
            ..Default::default()
        };

        for user_id in unique {
            for connection_id in self.connections.connection_ids(user_id).await? {
                let sent = self
                    .transport
                    .send_to_connection(&connection_id, event_name, &payload);
                metrics::record_fanout(event_name, sent);
                if sent {
                    report.delivered += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }

        tracing::debug!(
            event = event_name,
            targets = report.targets,
            delivered = report.delivered,
            skipped = report.skipped,
            "Fan-out complete"
        );

        Ok(report)
    }

    /// Push `event` to the live connections of a single user.
    pub async fn send_to_user(
        &self,
        user_id: &str,
        event: &ClientEvent,
    ) -> Result<FanoutReport, AppError> {
        self.notify(&[user_id.to_string()], event).await
    }

    /// Like [`notify`](Self::notify), for callers whose own state change has
    /// already been persisted: a failed lookup is logged, not returned.
    pub async fn publish(&self, targets: &[String], event: &ClientEvent) -> FanoutReport {
        match self.notify(targets, event).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(event = event.event_name(), error = %e, "Fan-out failed");
                FanoutReport::default()
            }
        }
    }
}
