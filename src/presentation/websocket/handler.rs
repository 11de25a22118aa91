//! WebSocket Connection Handler
//!
//! One task per socket: authenticate at upgrade, register with the gateway
//! and the connection registry, answer action frames, and clean up on close.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::interval;

use super::dispatch::dispatch;
use super::messages::{Action, ClientFrame, ServerFrame};
use super::session::SessionState;
use crate::shared::error::AppError;
use crate::shared::ids;
use crate::startup::AppState;

/// Query string of the upgrade request
#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
) -> Result<Response, AppError> {
    let token = query
        .token
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;
    let user_id = state.services.auth.authorize(&token)?;

    let limits = &state.settings.websocket;
    Ok(ws
        .max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let connection_id = ids::new_connection_id();
    let mut session = SessionState::new(user_id.clone(), connection_id.clone());

    tracing::debug!(user_id = %user_id, connection_id = %connection_id, "New WebSocket connection");

    // Split socket for concurrent read/write
    let (mut sender, mut receiver) = socket.split();

    // Create channel for outgoing frames
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    // Forward frames from the channel to the socket
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to serialize frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    state
        .gateway
        .register_session(&connection_id, &user_id, tx.clone());

    let _ = tx.send(ServerFrame::Hello {
        connection_id: connection_id.clone(),
        user_id: user_id.clone(),
        heartbeat_interval: state.gateway.heartbeat_interval(),
    });

    if let Err(e) = state.services.presence.on_connect(&user_id, &connection_id).await {
        e.log();
        let _ = tx.send(ServerFrame::error(None, &e));
        state.gateway.unregister_session(&connection_id);
        // Let the error frame flush before the socket drops
        tokio::time::sleep(Duration::from_millis(100)).await;
        sender_task.abort();
        return;
    }

    tracing::info!(user_id = %user_id, connection_id = %connection_id, "User connected");

    let heartbeat_timeout = Duration::from_secs(state.settings.websocket.heartbeat_timeout_secs);
    let mut heartbeat_check = interval(Duration::from_millis(state.gateway.heartbeat_interval()));
    heartbeat_check.tick().await; // Skip first immediate tick

    // Main message loop
    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        session.touch();
                        let reply = handle_frame(&text, &mut session, &state).await;
                        if tx.send(reply).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection_id, "Connection closed");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping, pong and binary frames still prove liveness
                        session.touch();
                    }
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = heartbeat_check.tick() => {
                if !session.is_alive(heartbeat_timeout) {
                    tracing::info!(connection_id = %connection_id, "Heartbeat timeout, closing connection");
                    break;
                }
            }
        }
    }

    // Cleanup
    state.gateway.unregister_session(&connection_id);
    if let Err(e) = state.services.presence.on_disconnect(&user_id, &connection_id).await {
        e.log();
    }
    sender_task.abort();

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection_id,
        actions = session.actions_handled,
        "User disconnected"
    );
}

/// Decode one text frame, run it, and build the reply frame
async fn handle_frame(text: &str, session: &mut SessionState, state: &AppState) -> ServerFrame {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            let err = AppError::bad_request(format!("Invalid frame: {}", e));
            return ServerFrame::error(None, &err);
        }
    };

    let action = match Action::from_frame(&frame) {
        Ok(action) => action,
        Err(err) => return ServerFrame::error(frame.id, &err),
    };

    if matches!(action, Action::Heartbeat) {
        tracing::trace!(connection_id = %session.connection_id, "Heartbeat received");
        return ServerFrame::HeartbeatAck;
    }

    session.actions_handled += 1;
    tracing::debug!(
        user_id = %session.user_id,
        connection_id = %session.connection_id,
        action = action.name(),
        "Dispatching action"
    );

    match dispatch(&state.services, &session.user_id, action).await {
        Ok(data) => ServerFrame::Ok { id: frame.id, data },
        Err(err) => {
            err.log();
            ServerFrame::error(frame.id, &err)
        }
    }
}
