//! Chat Service
//!
//! Creates and deduplicates Individual chats, wraps groups in Group chats,
//! and manages per-user archive and clear state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::access::ChatAccessResolver;
use super::notification_service::NotificationFanout;
use crate::application::dto::{
    ArchiveChanged, ChatSummary, ClearOutcome, ClientEvent, IndividualChat, Recipient,
};
use crate::domain::{
    sort_for_presentation, Chat, ChatRepository, ChatType, GroupRepository, MessageRepository,
    UserRepository,
};
use crate::shared::error::AppError;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Return the Individual chat of `{user_id, recipient_id}`, creating it
    /// on first use.
    async fn get_or_create_individual(
        &self,
        user_id: &str,
        recipient_id: &str,
    ) -> Result<IndividualChat, AppError>;

    /// Create the Group chat wrapping `group_id`.
    async fn create_group_chat(&self, group_id: &str) -> Result<Chat, AppError>;

    /// Hide every message of the chat for `user_id`.
    async fn clear(
        &self,
        user_id: &str,
        chat_type: ChatType,
        chat_id: &str,
    ) -> Result<ClearOutcome, AppError>;

    async fn archive(&self, user_id: &str, chat_id: &str) -> Result<Chat, AppError>;

    async fn unarchive(&self, user_id: &str, chat_id: &str) -> Result<Chat, AppError>;

    /// Who the chat talks to from `user_id`'s side.
    async fn resolve_recipient(
        &self,
        user_id: &str,
        chat_type: ChatType,
        chat_id: &str,
    ) -> Result<Recipient, AppError>;

    /// Every chat `user_id` takes part in, with the messages they can see.
    async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, AppError>;
}

/// ChatService implementation
pub struct ChatServiceImpl {
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    access: ChatAccessResolver,
    fanout: Arc<NotificationFanout>,
}

impl ChatServiceImpl {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        messages: Arc<dyn MessageRepository>,
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
        fanout: Arc<NotificationFanout>,
    ) -> Self {
        let access = ChatAccessResolver::new(chats.clone(), groups.clone());
        Self {
            chats,
            messages,
            groups,
            users,
            access,
            fanout,
        }
    }

    async fn load_individual(&self, user_id: &str, chat_id: &str) -> Result<Chat, AppError> {
        let access = self.access.resolve(chat_id).await?;
        if access.chat.chat_type != ChatType::Individual {
            return Err(AppError::bad_request("Only individual chats can be archived"));
        }
        access.ensure_listed(user_id)?;
        Ok(access.chat)
    }

    async fn summarize(
        &self,
        user_id: &str,
        chat: Chat,
        recipient: Recipient,
    ) -> Result<ChatSummary, AppError> {
        let mut messages: Vec<_> = self
            .messages
            .find_by_chat(&chat.id)
            .await?
            .into_iter()
            .filter(|m| !m.is_deleted_for(user_id))
            .collect();
        sort_for_presentation(&mut messages);

        Ok(ChatSummary {
            archived: chat.is_archived_for(user_id),
            chat,
            recipient,
            messages,
        })
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn get_or_create_individual(
        &self,
        user_id: &str,
        recipient_id: &str,
    ) -> Result<IndividualChat, AppError> {
        if user_id == recipient_id {
            return Err(AppError::bad_request("Cannot open a chat with yourself"));
        }
        if self.users.find_by_id(recipient_id).await?.is_none() {
            return Err(AppError::not_found(format!("User {} not found", recipient_id)));
        }

        if let Some(chat) = self.chats.find_individual(user_id, recipient_id).await? {
            return Ok(IndividualChat {
                chat,
                created: false,
            });
        }

        let created = self
            .chats
            .create(&Chat::individual(user_id, recipient_id))
            .await?;

        // A racing caller may have written its own chat for the pair; the
        // earliest one is canonical, so re-read and converge on it.
        let chat = self
            .chats
            .find_individual(user_id, recipient_id)
            .await?
            .unwrap_or(created.clone());
        if chat.id != created.id {
            tracing::warn!(
                chat_id = %chat.id,
                duplicate_id = %created.id,
                "Duplicate individual chat created by a concurrent request"
            );
        } else {
            tracing::info!(chat_id = %chat.id, user_id = %user_id, recipient_id = %recipient_id, "Individual chat created");
        }

        Ok(IndividualChat {
            created: chat.id == created.id,
            chat,
        })
    }

    async fn create_group_chat(&self, group_id: &str) -> Result<Chat, AppError> {
        let chat = self.chats.create(&Chat::for_group(group_id)).await?;
        tracing::debug!(chat_id = %chat.id, group_id = %group_id, "Group chat created");
        Ok(chat)
    }

    async fn clear(
        &self,
        user_id: &str,
        chat_type: ChatType,
        chat_id: &str,
    ) -> Result<ClearOutcome, AppError> {
        let access = self.access.resolve_typed(chat_type, chat_id).await?;
        access.ensure_listed(user_id)?;

        let messages = self.messages.find_by_chat(chat_id).await?;
        if messages.is_empty() {
            return Err(AppError::bad_request("Chat has no messages"));
        }

        let now = Utc::now();
        let targets = [user_id.to_string()];
        let mut cleared = 0;
        for message in messages.iter().filter(|m| !m.is_deleted_for(user_id)) {
            self.messages
                .mark_deleted(chat_id, &message.id, &targets, now)
                .await?;
            cleared += 1;
        }

        tracing::debug!(user_id = %user_id, chat_id = %chat_id, cleared, "Chat cleared");

        Ok(ClearOutcome {
            chat_id: chat_id.to_string(),
            cleared,
        })
    }

    async fn archive(&self, user_id: &str, chat_id: &str) -> Result<Chat, AppError> {
        let chat = self.load_individual(user_id, chat_id).await?;
        if chat.is_archived_for(user_id) {
            return Err(AppError::bad_request("Chat is already archived"));
        }

        let now = Utc::now();
        let chat = self.chats.set_archived(chat_id, user_id, Some(now)).await?;

        let event = ClientEvent::ChatArchived(ArchiveChanged {
            chat_id: chat.id.clone(),
            archived_at: Some(now),
        });
        self.fanout.publish(&[user_id.to_string()], &event).await;

        Ok(chat)
    }

    async fn unarchive(&self, user_id: &str, chat_id: &str) -> Result<Chat, AppError> {
        let chat = self.load_individual(user_id, chat_id).await?;
        if !chat.is_archived_for(user_id) {
            return Err(AppError::bad_request("Chat is not archived"));
        }

        let chat = self.chats.set_archived(chat_id, user_id, None).await?;

        let event = ClientEvent::ChatUnarchived(ArchiveChanged {
            chat_id: chat.id.clone(),
            archived_at: None,
        });
        self.fanout.publish(&[user_id.to_string()], &event).await;

        Ok(chat)
    }

    async fn resolve_recipient(
        &self,
        user_id: &str,
        chat_type: ChatType,
        chat_id: &str,
    ) -> Result<Recipient, AppError> {
        let access = self.access.resolve_typed(chat_type, chat_id).await?;

        match access.chat.chat_type {
            ChatType::Individual => {
                access.ensure_listed(user_id)?;
                let other = access
                    .chat
                    .other_participant(user_id)
                    .ok_or_else(|| AppError::Unexpected(format!("Chat {} has no recipient", chat_id)))?;
                Ok(Recipient::User {
                    user_id: other.to_string(),
                })
            }
            ChatType::Group => {
                let group_id = access
                    .chat
                    .group_id()
                    .ok_or_else(|| AppError::Unexpected(format!("Chat {} has no group", chat_id)))?;
                Ok(Recipient::Group {
                    group_id: group_id.to_string(),
                })
            }
        }
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, AppError> {
        let mut summaries = Vec::new();

        for chat in self.chats.find_by_participant(user_id).await? {
            let Some(other) = chat.other_participant(user_id).map(str::to_string) else {
                continue;
            };
            let recipient = Recipient::User { user_id: other };
            summaries.push(self.summarize(user_id, chat, recipient).await?);
        }

        for group in self.groups.find_by_participant(user_id).await? {
            let chat = match &group.chat_id {
                Some(chat_id) => self.chats.find_by_id(chat_id).await?,
                None => self.chats.find_by_group(&group.id).await?,
            };
            let Some(chat) = chat else {
                tracing::warn!(group_id = %group.id, "Group has no chat");
                continue;
            };
            let recipient = Recipient::Group { group_id: group.id };
            summaries.push(self.summarize(user_id, chat, recipient).await?);
        }

        Ok(summaries)
    }
}
