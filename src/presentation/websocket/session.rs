//! WebSocket Session State

use std::time::{Duration, Instant};

/// Per-socket state owned by the connection task
#[derive(Debug)]
pub struct SessionState {
    pub user_id: String,
    pub connection_id: String,
    pub last_seen: Instant,
    pub actions_handled: u64,
}

impl SessionState {
    pub fn new(user_id: String, connection_id: String) -> Self {
        Self {
            user_id,
            connection_id,
            last_seen: Instant::now(),
            actions_handled: 0,
        }
    }

    /// Any inbound frame counts as a heartbeat.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_alive(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() < timeout
    }
}
