//! Redis Connection Registry
//!
//! Redis-backed ConnectionRepository, shared by every node of the service.
//!
//! Layout per user:
//! - `presence:conns:{user_id}`: SET of live connection ids
//! - `presence:user:{user_id}`: HASH with `last_disconnect` (RFC 3339, or
//!   empty while online); its existence marks a known user
//! - `presence:online`: SET of users holding at least one live connection

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::keys;
use crate::domain::{ConnectionEntry, ConnectionRepository, Removal};
use crate::shared::error::AppError;

const LAST_DISCONNECT: &str = "last_disconnect";

/// Redis connection registry
#[derive(Clone)]
pub struct RedisConnectionRepository {
    redis: ConnectionManager,
}

impl RedisConnectionRepository {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn encode_marker(at: Option<DateTime<Utc>>) -> String {
        at.map(|t| t.to_rfc3339()).unwrap_or_default()
    }

    fn decode_marker(raw: Option<&String>) -> Result<Option<DateTime<Utc>>, AppError> {
        match raw.map(String::as_str) {
            None | Some("") => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| AppError::Unexpected(format!("Corrupt presence marker: {}", e))),
        }
    }

    /// Health check probe
    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionRepository for RedisConnectionRepository {
    async fn find(&self, user_id: &str) -> Result<Option<ConnectionEntry>, AppError> {
        let mut conn = self.redis.clone();

        let fields: HashMap<String, String> = conn.hgetall(keys::presence_user(user_id)).await?;
        let connection_ids: BTreeSet<String> =
            conn.smembers(keys::presence_connections(user_id)).await?;

        if fields.is_empty() && connection_ids.is_empty() {
            return Ok(None);
        }

        Ok(Some(ConnectionEntry {
            user_id: user_id.to_string(),
            connection_ids,
            last_disconnect: Self::decode_marker(fields.get(LAST_DISCONNECT))?,
        }))
    }

    async fn add_connection(&self, user_id: &str, connection_id: &str) -> Result<bool, AppError> {
        let mut conn = self.redis.clone();

        let (added,): (i64,) = redis::pipe()
            .atomic()
            .sadd(keys::presence_connections(user_id), connection_id)
            .hset(keys::presence_user(user_id), LAST_DISCONNECT, "")
            .ignore()
            .sadd(keys::PRESENCE_ONLINE, user_id)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(added > 0)
    }

    async fn remove_connection(&self, user_id: &str, connection_id: &str) -> Result<Removal, AppError> {
        let mut conn = self.redis.clone();
        let now = Utc::now();

        // Removal, disconnect stamp and online-set update run as one step so
        // a connect from another node cannot land between them.
        let script = redis::Script::new(
            r#"
            local removed = redis.call('SREM', KEYS[1], ARGV[1])
            if removed == 0 then
                return {0, 0}
            end

            local remaining = redis.call('SCARD', KEYS[1])
            if remaining == 0 then
                redis.call('HSET', KEYS[2], ARGV[2], ARGV[3])
                redis.call('SREM', KEYS[3], ARGV[4])
            end
            return {1, remaining}
            "#,
        );

        let (removed, remaining): (i64, usize) = script
            .key(keys::presence_connections(user_id))
            .key(keys::presence_user(user_id))
            .key(keys::PRESENCE_ONLINE)
            .arg(connection_id)
            .arg(LAST_DISCONNECT)
            .arg(Self::encode_marker(Some(now)))
            .arg(user_id)
            .invoke_async(&mut conn)
            .await?;

        if removed == 0 {
            return Ok(Removal::NotFound);
        }

        Ok(Removal::Removed {
            remaining,
            last_disconnect: (remaining == 0).then_some(now),
        })
    }

    async fn set_last_disconnect(
        &self,
        user_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let _: i64 = conn
            .hset(
                keys::presence_user(user_id),
                LAST_DISCONNECT,
                Self::encode_marker(at),
            )
            .await?;
        Ok(())
    }

    async fn connection_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let mut conn = self.redis.clone();
        let ids: Vec<String> = conn.smembers(keys::presence_connections(user_id)).await?;
        Ok(ids)
    }

    async fn online_user_ids(&self) -> Result<Vec<String>, AppError> {
        let mut conn = self.redis.clone();
        let ids: Vec<String> = conn.smembers(keys::PRESENCE_ONLINE).await?;
        Ok(ids)
    }
}
