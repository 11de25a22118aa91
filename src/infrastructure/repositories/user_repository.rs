//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait over the `users`
//! document collection.

use async_trait::async_trait;

use crate::domain::{User, UserRepository};
use crate::infrastructure::database::{collections::USERS, DocumentStore};
use crate::shared::error::AppError;

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    store: DocumentStore,
}

impl PgUserRepository {
    /// Create a new PgUserRepository over the given document store.
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.store.get(USERS, id).await
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        self.store.get_many(USERS, ids).await
    }

    /// Display-name substring match, ordered by display name.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<User>, AppError> {
        self.store.search(USERS, "display_name", query, limit).await
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        self.store.insert(USERS, &user.id, user).await?;
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        self.store.replace(USERS, &user.id, user).await?;
        Ok(user.clone())
    }
}
