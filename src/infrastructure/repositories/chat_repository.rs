//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait over the `chats`
//! document collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{earliest, Chat, ChatRepository};
use crate::infrastructure::database::{collections::CHATS, DocumentStore};
use crate::shared::error::AppError;

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    store: DocumentStore,
}

impl PgChatRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Chat>, AppError> {
        self.store.get(CHATS, id).await
    }

    async fn find_individual(&self, a: &str, b: &str) -> Result<Option<Chat>, AppError> {
        // Array containment ignores order, so {a, b} and {b, a} both match.
        let chats: Vec<Chat> = self
            .store
            .find(CHATS, json!({ "type": "individual", "participants": [a, b] }))
            .await?;

        Ok(earliest(chats.into_iter().filter(|c| c.is_pair(a, b))))
    }

    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Chat>, AppError> {
        self.store
            .find(CHATS, json!({ "type": "individual", "participants": [user_id] }))
            .await
    }

    async fn find_by_group(&self, group_id: &str) -> Result<Option<Chat>, AppError> {
        let chats: Vec<Chat> = self
            .store
            .find(CHATS, json!({ "type": "group", "participants": [group_id] }))
            .await?;
        Ok(earliest(chats))
    }

    async fn create(&self, chat: &Chat) -> Result<Chat, AppError> {
        self.store.insert(CHATS, &chat.id, chat).await?;
        Ok(chat.clone())
    }

    async fn set_archived(
        &self,
        chat_id: &str,
        user_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Chat, AppError> {
        match at {
            Some(at) => {
                self.store
                    .set_key(CHATS, chat_id, &["archived", user_id], serde_json::to_value(at)?)
                    .await
            }
            None => self.store.remove_key(CHATS, chat_id, &["archived", user_id]).await,
        }
    }
}
