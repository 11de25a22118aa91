//! Repository Implementations
//!
//! PostgreSQL implementations of the domain repository traits, all built on
//! the shared [`DocumentStore`].
//!
//! ## Available Repositories
//!
//! - **PgUserRepository** - Users, profiles and name search
//! - **PgChatRepository** - Individual and group chats
//! - **PgMessageRepository** - Messages with per-recipient status maps
//! - **PgGroupRepository** - Group rosters and metadata
//! - **PgCallRepository** - Call records and call logs
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let store = DocumentStore::new(pool);
//! let repositories = postgres_repositories(store, Arc::new(RedisConnectionRepository::new(redis)));
//! ```

use std::sync::Arc;

pub mod call_repository;
pub mod chat_repository;
pub mod group_repository;
pub mod message_repository;
pub mod user_repository;

pub use call_repository::PgCallRepository;
pub use chat_repository::PgChatRepository;
pub use group_repository::PgGroupRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;

use crate::domain::{ConnectionRepository, Repositories};
use crate::infrastructure::database::DocumentStore;

/// Wire the PostgreSQL repositories together with a connection registry.
pub fn postgres_repositories(
    store: DocumentStore,
    connections: Arc<dyn ConnectionRepository>,
) -> Repositories {
    Repositories {
        users: Arc::new(PgUserRepository::new(store.clone())),
        connections,
        chats: Arc::new(PgChatRepository::new(store.clone())),
        messages: Arc::new(PgMessageRepository::new(store.clone())),
        groups: Arc::new(PgGroupRepository::new(store.clone())),
        calls: Arc::new(PgCallRepository::new(store)),
    }
}
