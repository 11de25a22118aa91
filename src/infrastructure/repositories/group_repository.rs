//! Group Repository Implementation
//!
//! PostgreSQL implementation of the GroupRepository trait over the `groups`
//! document collection.

use async_trait::async_trait;

use crate::domain::{Group, GroupRepository};
use crate::infrastructure::database::{collections::GROUPS, DocumentStore};
use crate::shared::error::AppError;

/// PostgreSQL group repository implementation.
#[derive(Clone)]
pub struct PgGroupRepository {
    store: DocumentStore,
}

impl PgGroupRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Group>, AppError> {
        self.store.get(GROUPS, id).await
    }

    /// Groups whose role map lists the user, Former included.
    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Group>, AppError> {
        self.store
            .find_with_key(GROUPS, &["participants"], user_id)
            .await
    }

    async fn create(&self, group: &Group) -> Result<Group, AppError> {
        self.store.insert(GROUPS, &group.id, group).await?;
        Ok(group.clone())
    }

    async fn update(&self, group: &Group) -> Result<Group, AppError> {
        self.store.replace(GROUPS, &group.id, group).await?;
        Ok(group.clone())
    }
}
