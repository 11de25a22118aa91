//! Cache Module
//!
//! Redis connection management and the Redis-backed connection registry.
//!
//! # Architecture
//!
//! ```text
//! +---------------------------+
//! |   PresenceService         |
//! +---------------------------+
//!          |
//!          v
//! +---------------------------+
//! |   ConnectionRepository    |  <-- Domain trait
//! +---------------------------+
//!          |
//!          v
//! +---------------------------+
//! | RedisConnectionRepository |  <-- Concrete implementation
//! +---------------------------+
//!          |
//!          v
//! +---------------------------+
//! |   ConnectionManager       |  <-- Reconnecting Redis connection
//! +---------------------------+
//! ```

mod connection_cache;

pub use connection_cache::RedisConnectionRepository;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Arguments
/// * `settings` - Redis configuration settings
///
/// # Returns
/// * `Ok(ConnectionManager)` - On successful connection
/// * `Err(redis::RedisError)` - If connection fails
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key prefixes for the connection registry.
pub mod keys {
    /// Prefix for a user's live connection set (e.g., "presence:conns:user_id")
    pub const PRESENCE_CONNECTIONS: &str = "presence:conns:";

    /// Prefix for a user's presence hash (e.g., "presence:user:user_id")
    pub const PRESENCE_USER: &str = "presence:user:";

    /// Set of users with at least one live connection
    pub const PRESENCE_ONLINE: &str = "presence:online";

    /// Generates the connection set key for a user
    #[inline]
    pub fn presence_connections(user_id: impl std::fmt::Display) -> String {
        format!("{}{}", PRESENCE_CONNECTIONS, user_id)
    }

    /// Generates the presence hash key for a user
    #[inline]
    pub fn presence_user(user_id: impl std::fmt::Display) -> String {
        format!("{}{}", PRESENCE_USER, user_id)
    }
}
