//! Message Service
//!
//! The message ledger: sending, per-recipient Delivered/Read marks and
//! per-user soft deletion.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::access::{ChatAccess, ChatAccessResolver};
use super::notification_service::NotificationFanout;
use crate::application::dto::{ClientEvent, MessageEnvelope, MessageOutcome};
use crate::domain::{
    sort_for_presentation, ContentKind, DeleteScope, Message, MessageRepository, StatusKind,
};
use crate::shared::error::AppError;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Post a message to a chat.
    async fn send(
        &self,
        user_id: &str,
        chat_id: &str,
        content: &str,
        content_kind: ContentKind,
    ) -> Result<MessageOutcome, AppError>;

    /// Record that `user_id` received a message.
    async fn mark_delivered(
        &self,
        user_id: &str,
        chat_id: &str,
        message_id: &str,
    ) -> Result<MessageOutcome, AppError>;

    /// Record that `user_id` read a message.
    async fn mark_read(
        &self,
        user_id: &str,
        chat_id: &str,
        message_id: &str,
    ) -> Result<MessageOutcome, AppError>;

    /// Hide a message for the caller or for every participant.
    async fn delete(
        &self,
        user_id: &str,
        chat_id: &str,
        message_id: &str,
        scope: DeleteScope,
    ) -> Result<MessageOutcome, AppError>;

    /// Messages of a chat visible to `user_id`, in presentation order.
    async fn list_messages(&self, user_id: &str, chat_id: &str) -> Result<Vec<Message>, AppError>;
}

/// MessageService implementation
pub struct MessageServiceImpl {
    messages: Arc<dyn MessageRepository>,
    access: ChatAccessResolver,
    fanout: Arc<NotificationFanout>,
}

impl MessageServiceImpl {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        access: ChatAccessResolver,
        fanout: Arc<NotificationFanout>,
    ) -> Self {
        Self {
            messages,
            access,
            fanout,
        }
    }

    async fn load_message(&self, chat_id: &str, message_id: &str) -> Result<Message, AppError> {
        self.messages
            .find_by_id(chat_id, message_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {} not found", message_id)))
    }

    fn outcome(access: &ChatAccess, message: Message, recipients: Vec<String>) -> MessageOutcome {
        MessageOutcome {
            chat_type: access.chat.chat_type,
            chat_id: access.chat.id.clone(),
            message,
            recipients,
        }
    }

    fn envelope(outcome: &MessageOutcome) -> MessageEnvelope {
        MessageEnvelope {
            chat_type: outcome.chat_type,
            chat_id: outcome.chat_id.clone(),
            message: outcome.message.clone(),
        }
    }

    async fn mark(
        &self,
        kind: StatusKind,
        user_id: &str,
        chat_id: &str,
        message_id: &str,
    ) -> Result<MessageOutcome, AppError> {
        let access = self.access.resolve(chat_id).await?;
        access.ensure_listed(user_id)?;
        self.load_message(chat_id, message_id).await?;

        let message = self
            .messages
            .mark_status(chat_id, message_id, kind, user_id, Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::bad_request(format!("Message already marked as {}", kind.as_str()))
            })?;

        tracing::debug!(
            user_id = %user_id,
            chat_id = %chat_id,
            message_id = %message_id,
            status = kind.as_str(),
            "Message status recorded"
        );

        let outcome = Self::outcome(&access, message, access.recipients());
        let targets = except(&outcome.recipients, user_id);
        self.fanout
            .publish(&targets, &ClientEvent::MessageStatusChanged(Self::envelope(&outcome)))
            .await;

        Ok(outcome)
    }
}

/// `users` without `user_id`.
fn except(users: &[String], user_id: &str) -> Vec<String> {
    users.iter().filter(|u| u.as_str() != user_id).cloned().collect()
}

#[async_trait]
impl MessageService for MessageServiceImpl {
    async fn send(
        &self,
        user_id: &str,
        chat_id: &str,
        content: &str,
        content_kind: ContentKind,
    ) -> Result<MessageOutcome, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::bad_request("Message content cannot be empty"));
        }

        let access = self.access.resolve(chat_id).await?;
        access.ensure_active(user_id)?;

        let message = Message::new(chat_id, user_id, content, content_kind, Utc::now());
        let message = self.messages.create(&message).await?;

        tracing::debug!(user_id = %user_id, chat_id = %chat_id, message_id = %message.id, "Message sent");

        let outcome = Self::outcome(&access, message, access.recipients());
        let targets = except(&outcome.recipients, user_id);
        self.fanout
            .publish(&targets, &ClientEvent::MessageCreated(Self::envelope(&outcome)))
            .await;

        Ok(outcome)
    }

    async fn mark_delivered(
        &self,
        user_id: &str,
        chat_id: &str,
        message_id: &str,
    ) -> Result<MessageOutcome, AppError> {
        self.mark(StatusKind::Delivered, user_id, chat_id, message_id).await
    }

    async fn mark_read(
        &self,
        user_id: &str,
        chat_id: &str,
        message_id: &str,
    ) -> Result<MessageOutcome, AppError> {
        self.mark(StatusKind::Read, user_id, chat_id, message_id).await
    }

    async fn delete(
        &self,
        user_id: &str,
        chat_id: &str,
        message_id: &str,
        scope: DeleteScope,
    ) -> Result<MessageOutcome, AppError> {
        let access = self.access.resolve(chat_id).await?;
        access.ensure_listed(user_id)?;
        let current = self.load_message(chat_id, message_id).await?;

        let (targets, recipients) = match scope {
            DeleteScope::Me => {
                if current.is_deleted_for(user_id) {
                    return Err(AppError::bad_request("Message already deleted"));
                }
                (vec![user_id.to_string()], vec![user_id.to_string()])
            }
            DeleteScope::Everyone => {
                // Former group participants keep their copy
                let recipients = access.recipients();
                let missing: Vec<String> = recipients
                    .iter()
                    .filter(|id| !current.is_deleted_for(id))
                    .cloned()
                    .collect();
                (missing, recipients)
            }
        };

        if targets.is_empty() {
            tracing::debug!(message_id = %message_id, "Message already deleted for every participant");
            return Ok(Self::outcome(&access, current, recipients));
        }

        let message = self
            .messages
            .mark_deleted(chat_id, message_id, &targets, Utc::now())
            .await?;

        tracing::debug!(
            user_id = %user_id,
            chat_id = %chat_id,
            message_id = %message_id,
            scope = ?scope,
            "Message deleted"
        );

        let outcome = Self::outcome(&access, message, recipients);
        self.fanout
            .publish(&outcome.recipients, &ClientEvent::MessageDeleted(Self::envelope(&outcome)))
            .await;

        Ok(outcome)
    }

    async fn list_messages(&self, user_id: &str, chat_id: &str) -> Result<Vec<Message>, AppError> {
        let access = self.access.resolve(chat_id).await?;
        access.ensure_listed(user_id)?;

        let mut messages: Vec<Message> = self
            .messages
            .find_by_chat(chat_id)
            .await?
            .into_iter()
            .filter(|m| !m.is_deleted_for(user_id))
            .collect();
        sort_for_presentation(&mut messages);

        Ok(messages)
    }
}
