//! Message Repository Implementation
//!
//! PostgreSQL implementation of the MessageRepository trait over the
//! `messages` document collection. Status marks and delete markers are
//! single-key patches, so concurrent marks by different recipients land on
//! disjoint keys and never overwrite each other.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{Message, MessageRepository, StatusKind};
use crate::infrastructure::database::{collections::MESSAGES, DocumentStore};
use crate::shared::error::AppError;

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    store: DocumentStore,
}

impl PgMessageRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    fn not_found(message_id: &str) -> AppError {
        AppError::not_found(format!("Message {} not found", message_id))
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_by_id(&self, chat_id: &str, message_id: &str) -> Result<Option<Message>, AppError> {
        let message: Option<Message> = self.store.get(MESSAGES, message_id).await?;
        Ok(message.filter(|m| m.chat_id == chat_id))
    }

    async fn find_by_chat(&self, chat_id: &str) -> Result<Vec<Message>, AppError> {
        self.store.find(MESSAGES, json!({ "chat_id": chat_id })).await
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        self.store.insert(MESSAGES, &message.id, message).await?;
        Ok(message.clone())
    }

    async fn mark_status(
        &self,
        chat_id: &str,
        message_id: &str,
        kind: StatusKind,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Message>, AppError> {
        if self.find_by_id(chat_id, message_id).await?.is_none() {
            return Err(Self::not_found(message_id));
        }

        self.store
            .set_key_if_absent(
                MESSAGES,
                message_id,
                &["status", kind.as_str(), user_id],
                serde_json::to_value(at)?,
            )
            .await
    }

    async fn mark_deleted(
        &self,
        chat_id: &str,
        message_id: &str,
        user_ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<Message, AppError> {
        if self.find_by_id(chat_id, message_id).await?.is_none() {
            return Err(Self::not_found(message_id));
        }

        let entries: BTreeMap<&str, DateTime<Utc>> =
            user_ids.iter().map(|id| (id.as_str(), at)).collect();
        self.store
            .merge_missing(MESSAGES, message_id, &["deleted"], serde_json::to_value(entries)?)
            .await
    }
}
