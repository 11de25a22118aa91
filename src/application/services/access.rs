//! Chat access resolution shared by the chat and message coordinators.

use std::sync::Arc;

use crate::domain::{Chat, ChatRepository, ChatType, Group, GroupRepository};
use crate::shared::error::AppError;

/// A chat together with the group behind it, if any.
#[derive(Debug, Clone)]
pub struct ChatAccess {
    pub chat: Chat,
    pub group: Option<Group>,
}

impl ChatAccess {
    /// Listed on the chat: either Individual participant, or any role in
    /// the group's role map (Former included).
    pub fn is_listed(&self, user_id: &str) -> bool {
        match &self.group {
            Some(group) => group.is_listed(user_id),
            None => self.chat.is_participant(user_id),
        }
    }

    /// Allowed to post: Individual participant or non-Former group member.
    pub fn is_active(&self, user_id: &str) -> bool {
        match &self.group {
            Some(group) => group.is_active_participant(user_id),
            None => self.chat.is_participant(user_id),
        }
    }

    pub fn ensure_listed(&self, user_id: &str) -> Result<(), AppError> {
        if self.is_listed(user_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("You are not a participant of this chat"))
        }
    }

    pub fn ensure_active(&self, user_id: &str) -> Result<(), AppError> {
        if self.is_active(user_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("You are not an active participant of this chat"))
        }
    }

    /// Users a message fans out to: both Individual participants, or the
    /// live group roster.
    pub fn recipients(&self) -> Vec<String> {
        match &self.group {
            Some(group) => group.active_participants(),
            None => self.chat.participants.clone(),
        }
    }
}

/// Loads chats and the groups they point at.
#[derive(Clone)]
pub struct ChatAccessResolver {
    chats: Arc<dyn ChatRepository>,
    groups: Arc<dyn GroupRepository>,
}

impl ChatAccessResolver {
    pub fn new(chats: Arc<dyn ChatRepository>, groups: Arc<dyn GroupRepository>) -> Self {
        Self { chats, groups }
    }

    pub async fn resolve(&self, chat_id: &str) -> Result<ChatAccess, AppError> {
        let chat = self
            .chats
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Chat {} not found", chat_id)))?;

        let group = match chat.group_id() {
            Some(group_id) => Some(
                self.groups
                    .find_by_id(group_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Group {} not found", group_id)))?,
            ),
            None => None,
        };

        Ok(ChatAccess { chat, group })
    }

    /// Resolve and check the chat has the type the caller claimed.
    pub async fn resolve_typed(
        &self,
        chat_type: ChatType,
        chat_id: &str,
    ) -> Result<ChatAccess, AppError> {
        let access = self.resolve(chat_id).await?;
        if access.chat.chat_type != chat_type {
            return Err(AppError::bad_request(format!(
                "Chat {} is not a {} chat",
                chat_id, chat_type
            )));
        }
        Ok(access)
    }
}
