//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections.

pub mod dispatch;
pub mod gateway;
pub mod handler;
pub mod messages;
pub mod session;

pub use gateway::Gateway;
pub use handler::ws_handler;
pub use messages::{Action, ClientFrame, ServerFrame};
pub use session::SessionState;
