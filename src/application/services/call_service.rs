//! Call Service
//!
//! Call lifecycle, busy detection and WebRTC signaling relay. Media never
//! passes through here; only SDP and ICE payloads are forwarded.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::notification_service::NotificationFanout;
use crate::application::dto::{CallDeleted, ClientEvent, RelayOutcome, SignalPayload, SignalRelayed};
use crate::domain::{Call, CallRepository, CallStatus, CallType, UserRepository};
use crate::shared::error::AppError;

/// Call service trait
#[async_trait]
pub trait CallService: Send + Sync {
    /// Ring `recipient_id`. A busy line still records the call, as Declined.
    async fn start(
        &self,
        caller_id: &str,
        recipient_id: &str,
        call_type: CallType,
    ) -> Result<Call, AppError>;

    async fn accept(&self, user_id: &str, call_id: &str) -> Result<Call, AppError>;

    /// Finish a call with the terminal status chosen by the ending party.
    async fn end(
        &self,
        user_id: &str,
        call_id: &str,
        final_status: CallStatus,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<Call, AppError>;

    /// Remove a call from the caller's log.
    async fn delete(&self, user_id: &str, call_id: &str) -> Result<Call, AppError>;

    /// Forward a signaling payload to the other participant.
    async fn relay_signal(
        &self,
        user_id: &str,
        call_id: &str,
        signal: SignalPayload,
    ) -> Result<RelayOutcome, AppError>;

    /// Calls of `user_id` not deleted by them, oldest first.
    async fn call_log(&self, user_id: &str) -> Result<Vec<Call>, AppError>;
}

/// CallService implementation
pub struct CallServiceImpl {
    calls: Arc<dyn CallRepository>,
    users: Arc<dyn UserRepository>,
    fanout: Arc<NotificationFanout>,
}

impl CallServiceImpl {
    pub fn new(
        calls: Arc<dyn CallRepository>,
        users: Arc<dyn UserRepository>,
        fanout: Arc<NotificationFanout>,
    ) -> Self {
        Self { calls, users, fanout }
    }

    /// Load a call the caller participates in.
    async fn load_call(&self, user_id: &str, call_id: &str) -> Result<Call, AppError> {
        let call = self
            .calls
            .find_by_id(call_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Call {} not found", call_id)))?;

        if !call.is_participant(user_id) {
            return Err(AppError::forbidden("You are not a participant of this call"));
        }
        Ok(call)
    }

    async fn is_busy(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(!self.calls.find_active_by_participant(user_id).await?.is_empty())
    }
}

#[async_trait]
impl CallService for CallServiceImpl {
    async fn start(
        &self,
        caller_id: &str,
        recipient_id: &str,
        call_type: CallType,
    ) -> Result<Call, AppError> {
        if caller_id == recipient_id {
            return Err(AppError::bad_request("Cannot call yourself"));
        }
        if self.users.find_by_id(recipient_id).await?.is_none() {
            return Err(AppError::not_found(format!("User {} not found", recipient_id)));
        }

        if self.is_busy(caller_id).await? || self.is_busy(recipient_id).await? {
            let call = Call::new(caller_id, recipient_id, call_type, CallStatus::Declined);
            let call = self.calls.create(&call).await?;
            tracing::warn!(
                call_id = %call.id,
                caller_id = %caller_id,
                recipient_id = %recipient_id,
                "Line busy, call auto-declined"
            );
            return Err(AppError::bad_request("Line busy"));
        }

        let call = Call::new(caller_id, recipient_id, call_type, CallStatus::Pending);
        let call = self.calls.create(&call).await?;
        tracing::info!(call_id = %call.id, caller_id = %caller_id, recipient_id = %recipient_id, "Call started");

        self.fanout
            .publish(&[caller_id.to_string()], &ClientEvent::CallOutgoing(call.clone()))
            .await;
        self.fanout
            .publish(&[recipient_id.to_string()], &ClientEvent::CallIncoming(call.clone()))
            .await;

        Ok(call)
    }

    async fn accept(&self, user_id: &str, call_id: &str) -> Result<Call, AppError> {
        let call = self.load_call(user_id, call_id).await?;
        if call.status != CallStatus::Pending {
            return Err(AppError::bad_request(format!(
                "Call is {}, only pending calls can be accepted",
                call.status
            )));
        }

        let call = self
            .calls
            .update_status(call_id, CallStatus::Ongoing, None)
            .await?;
        tracing::info!(call_id = %call_id, user_id = %user_id, "Call accepted");

        self.fanout
            .publish(&call.participants, &ClientEvent::CallAccepted(call.clone()))
            .await;

        Ok(call)
    }

    async fn end(
        &self,
        user_id: &str,
        call_id: &str,
        final_status: CallStatus,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<Call, AppError> {
        let call = self.load_call(user_id, call_id).await?;
        if !call.status.can_transition_to(final_status) || final_status.is_active() {
            return Err(AppError::bad_request(format!(
                "Cannot end a {} call as {}",
                call.status, final_status
            )));
        }

        let duration = started_at.map(|at| (Utc::now() - at).num_seconds().max(0));
        let call = self
            .calls
            .update_status(call_id, final_status, duration)
            .await?;
        tracing::info!(
            call_id = %call_id,
            user_id = %user_id,
            status = %final_status,
            duration_secs = ?duration,
            "Call ended"
        );

        self.fanout
            .publish(&call.participants, &ClientEvent::CallEnded(call.clone()))
            .await;

        Ok(call)
    }

    async fn delete(&self, user_id: &str, call_id: &str) -> Result<Call, AppError> {
        let call = self.load_call(user_id, call_id).await?;
        if call.is_deleted_for(user_id) {
            return Err(AppError::bad_request("Call already deleted"));
        }

        let call = self.calls.mark_deleted(call_id, user_id, Utc::now()).await?;

        let event = ClientEvent::CallDeleted(CallDeleted {
            call_id: call.id.clone(),
        });
        self.fanout.publish(&[user_id.to_string()], &event).await;

        Ok(call)
    }

    async fn relay_signal(
        &self,
        user_id: &str,
        call_id: &str,
        signal: SignalPayload,
    ) -> Result<RelayOutcome, AppError> {
        let call = self.load_call(user_id, call_id).await?;

        let event = ClientEvent::SignalRelayed(SignalRelayed {
            call_id: call.id.clone(),
            from_user_id: user_id.to_string(),
            signal,
        });
        let report = self.fanout.notify(&call.others(user_id), &event).await?;

        Ok(RelayOutcome {
            delivered: report.delivered,
        })
    }

    async fn call_log(&self, user_id: &str) -> Result<Vec<Call>, AppError> {
        let mut calls: Vec<Call> = self
            .calls
            .find_by_participant(user_id)
            .await?
            .into_iter()
            .filter(|c| !c.is_deleted_for(user_id))
            .collect();
        calls.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(calls)
    }
}
