//! WebSocket Gateway
//!
//! Holds the outbound channel of every socket on this node and delivers
//! fan-out events to them. Which user owns which connection lives in the
//! connection registry; the gateway only knows connection ids.

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::messages::ServerFrame;
use crate::domain::FanoutTransport;
use crate::infrastructure::metrics;

/// A socket attached to this node
pub struct ConnectedSession {
    pub user_id: String,
    pub sender: mpsc::UnboundedSender<ServerFrame>,
}

/// WebSocket gateway managing all connections
pub struct Gateway {
    /// Live sessions by connection id
    sessions: DashMap<String, ConnectedSession>,
    /// Heartbeat interval announced to clients, in milliseconds
    heartbeat_interval_ms: u64,
}

impl Gateway {
    pub fn new(heartbeat_interval_ms: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            heartbeat_interval_ms,
        }
    }

    /// Get the heartbeat interval
    pub fn heartbeat_interval(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    /// Register a new connected session
    pub fn register_session(
        &self,
        connection_id: &str,
        user_id: &str,
        sender: mpsc::UnboundedSender<ServerFrame>,
    ) {
        self.sessions.insert(
            connection_id.to_string(),
            ConnectedSession {
                user_id: user_id.to_string(),
                sender,
            },
        );
        metrics::websocket_connected();

        tracing::info!(user_id = %user_id, connection_id = %connection_id, "Session registered");
    }

    /// Unregister a session
    pub fn unregister_session(&self, connection_id: &str) {
        if let Some((_, session)) = self.sessions.remove(connection_id) {
            metrics::websocket_disconnected();
            tracing::info!(
                user_id = %session.user_id,
                connection_id = %connection_id,
                "Session unregistered"
            );
        }
    }

    /// Send a frame directly to a session
    pub fn send_to_session(&self, connection_id: &str, frame: ServerFrame) -> bool {
        self.sessions
            .get(connection_id)
            .map(|session| session.sender.send(frame).is_ok())
            .unwrap_or(false)
    }

    /// Get session count
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl FanoutTransport for Gateway {
    fn send_to_connection(
        &self,
        connection_id: &str,
        event_name: &str,
        payload: &serde_json::Value,
    ) -> bool {
        self.send_to_session(
            connection_id,
            ServerFrame::Event {
                event: event_name.to_string(),
                data: payload.clone(),
            },
        )
    }
}
