//! In-memory store.
//!
//! Implements every repository trait over process-local maps with the same
//! semantics as the PostgreSQL and Redis backends. Each per-document patch
//! runs under that document's map entry lock, matching the single-statement
//! patches of the SQL store. Used by tests and by single-node runs with
//! `storage.backend = "memory"`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::{
    earliest, Call, CallRepository, CallStatus, Chat, ChatRepository, ChatType, ConnectionEntry,
    ConnectionRepository, Group, GroupRepository, Message, MessageRepository, Removal,
    Repositories, StatusKind, User, UserRepository,
};
use crate::shared::error::AppError;

/// Process-local document maps.
#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<String, User>,
    chats: DashMap<String, Chat>,
    messages: DashMap<String, Message>,
    groups: DashMap<String, Group>,
    calls: DashMap<String, Call>,
    connections: RwLock<HashMap<String, ConnectionEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One store serving every repository.
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            users: self.clone(),
            connections: self.clone(),
            chats: self.clone(),
            messages: self.clone(),
            groups: self.clone(),
            calls: self.clone(),
        }
    }

    fn insert_new<T: Clone>(
        map: &DashMap<String, T>,
        collection: &str,
        id: &str,
        value: &T,
    ) -> Result<(), AppError> {
        match map.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::bad_request(format!(
                "Document {}/{} already exists",
                collection, id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(value.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        users.dedup_by(|a, b| a.id == b.id);
        Ok(users)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<User>, AppError> {
        let query = query.trim().to_lowercase();
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.display_name.to_lowercase().contains(&query))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name).then_with(|| a.id.cmp(&b.id)));
        users.truncate(limit);
        Ok(users)
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        Self::insert_new(&self.users, "users", &user.id, user)?;
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::not_found(format!("users {} not found", user.id)))?;
        *stored = user.clone();
        Ok(user.clone())
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryStore {
    async fn find(&self, user_id: &str) -> Result<Option<ConnectionEntry>, AppError> {
        Ok(self.connections.read().get(user_id).cloned())
    }

    async fn add_connection(&self, user_id: &str, connection_id: &str) -> Result<bool, AppError> {
        let mut connections = self.connections.write();
        let entry = connections
            .entry(user_id.to_string())
            .or_insert_with(|| ConnectionEntry::new(user_id));
        Ok(entry.add(connection_id))
    }

    async fn remove_connection(&self, user_id: &str, connection_id: &str) -> Result<Removal, AppError> {
        let mut connections = self.connections.write();
        let Some(entry) = connections.get_mut(user_id) else {
            return Ok(Removal::NotFound);
        };

        if entry.remove(connection_id, Utc::now()) {
            Ok(Removal::Removed {
                remaining: entry.connection_ids.len(),
                last_disconnect: entry.last_disconnect,
            })
        } else {
            Ok(Removal::NotFound)
        }
    }

    async fn set_last_disconnect(
        &self,
        user_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let mut connections = self.connections.write();
        connections
            .entry(user_id.to_string())
            .or_insert_with(|| ConnectionEntry::new(user_id))
            .last_disconnect = at;
        Ok(())
    }

    async fn connection_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .connections
            .read()
            .get(user_id)
            .map(|e| e.connection_ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn online_user_ids(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .connections
            .read()
            .values()
            .filter(|e| e.is_connected())
            .map(|e| e.user_id.clone())
            .collect())
    }
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Chat>, AppError> {
        Ok(self.chats.get(id).map(|c| c.value().clone()))
    }

    async fn find_individual(&self, a: &str, b: &str) -> Result<Option<Chat>, AppError> {
        let pairs: Vec<Chat> = self
            .chats
            .iter()
            .filter(|c| c.is_pair(a, b))
            .map(|c| c.value().clone())
            .collect();
        Ok(earliest(pairs))
    }

    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Chat>, AppError> {
        let mut chats: Vec<Chat> = self
            .chats
            .iter()
            .filter(|c| c.chat_type == ChatType::Individual && c.is_participant(user_id))
            .map(|c| c.value().clone())
            .collect();
        chats.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(chats)
    }

    async fn find_by_group(&self, group_id: &str) -> Result<Option<Chat>, AppError> {
        let chats: Vec<Chat> = self
            .chats
            .iter()
            .filter(|c| c.group_id() == Some(group_id))
            .map(|c| c.value().clone())
            .collect();
        Ok(earliest(chats))
    }

    async fn create(&self, chat: &Chat) -> Result<Chat, AppError> {
        Self::insert_new(&self.chats, "chats", &chat.id, chat)?;
        Ok(chat.clone())
    }

    async fn set_archived(
        &self,
        chat_id: &str,
        user_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Chat, AppError> {
        let mut chat = self
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| AppError::not_found(format!("chats {} not found", chat_id)))?;
        match at {
            Some(at) => {
                chat.archived.insert(user_id.to_string(), at);
            }
            None => {
                chat.archived.remove(user_id);
            }
        }
        Ok(chat.value().clone())
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn find_by_id(&self, chat_id: &str, message_id: &str) -> Result<Option<Message>, AppError> {
        Ok(self
            .messages
            .get(message_id)
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.value().clone()))
    }

    async fn find_by_chat(&self, chat_id: &str) -> Result<Vec<Message>, AppError> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.value().clone())
            .collect())
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        Self::insert_new(&self.messages, "messages", &message.id, message)?;
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
        let mut message = self
            .messages
            .get_mut(message_id)
            .filter(|m| m.chat_id == chat_id)
            .ok_or_else(|| AppError::not_found(format!("Message {} not found", message_id)))?;

        if message.mark(kind, user_id, at) {
            Ok(Some(message.value().clone()))
        } else {
            Ok(None)
        }
    }

    async fn mark_deleted(
        &self,
        chat_id: &str,
        message_id: &str,
        user_ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<Message, AppError> {
        let mut message = self
            .messages
            .get_mut(message_id)
            .filter(|m| m.chat_id == chat_id)
            .ok_or_else(|| AppError::not_found(format!("Message {} not found", message_id)))?;

        message.mark_deleted(user_ids, at);
        Ok(message.value().clone())
    }
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Group>, AppError> {
        Ok(self.groups.get(id).map(|g| g.value().clone()))
    }

    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Group>, AppError> {
        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .filter(|g| g.is_listed(user_id))
            .map(|g| g.value().clone())
            .collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn create(&self, group: &Group) -> Result<Group, AppError> {
        Self::insert_new(&self.groups, "groups", &group.id, group)?;
        Ok(group.clone())
    }

    async fn update(&self, group: &Group) -> Result<Group, AppError> {
        let mut stored = self
            .groups
            .get_mut(&group.id)
            .ok_or_else(|| AppError::not_found(format!("groups {} not found", group.id)))?;
        *stored = group.clone();
        Ok(group.clone())
    }
}

#[async_trait]
impl CallRepository for InMemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Call>, AppError> {
        Ok(self.calls.get(id).map(|c| c.value().clone()))
    }

    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Call>, AppError> {
        let mut calls: Vec<Call> = self
            .calls
            .iter()
            .filter(|c| c.is_participant(user_id))
            .map(|c| c.value().clone())
            .collect();
        calls.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(calls)
    }

    async fn find_active_by_participant(&self, user_id: &str) -> Result<Vec<Call>, AppError> {
        Ok(CallRepository::find_by_participant(self, user_id)
            .await?
            .into_iter()
            .filter(|c| c.status.is_active())
            .collect())
    }

    async fn create(&self, call: &Call) -> Result<Call, AppError> {
        Self::insert_new(&self.calls, "calls", &call.id, call)?;
        Ok(call.clone())
    }

    async fn update_status(
        &self,
        id: &str,
        status: CallStatus,
        duration_secs: Option<i64>,
    ) -> Result<Call, AppError> {
        let mut call = self
            .calls
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Call {} not found", id)))?;
        call.status = status;
        call.duration_secs = duration_secs;
        Ok(call.value().clone())
    }

    async fn mark_deleted(&self, id: &str, user_id: &str, at: DateTime<Utc>) -> Result<Call, AppError> {
        let mut call = self
            .calls
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Call {} not found", id)))?;
        call.deleted.entry(user_id.to_string()).or_insert(at);
        Ok(call.value().clone())
    }
}
