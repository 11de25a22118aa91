//! Action Dispatch
//!
//! Maps one decoded client action onto one coordinator call.

use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use super::messages::Action;
use crate::application::services::{GroupEdit, NewGroup, Services};
use crate::domain::{ChatType, DeleteScope};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::validation::validate;

fn reply<T: Serialize>(result: T) -> Result<Value, AppError> {
    Ok(serde_json::to_value(result)?)
}

fn checked<T: Validate>(request: T) -> Result<T, AppError> {
    validate(&request)?;
    Ok(request)
}

/// Run `action` on behalf of `user_id` and return the reply payload.
pub async fn dispatch(services: &Services, user_id: &str, action: Action) -> Result<Value, AppError> {
    let name = action.name();

    let result = run(services, user_id, action).await;
    if let Err(err) = &result {
        metrics::record_failure(name, err.kind().as_str());
    }
    result
}

async fn run(services: &Services, user_id: &str, action: Action) -> Result<Value, AppError> {
    match action {
        Action::Heartbeat => Ok(Value::Null),

        Action::GetUser(req) => {
            let req = checked(req)?;
            reply(services.users.get_profile(user_id, &req.user_id).await?)
        }
        Action::ResetPresence => reply(services.presence.reset_presence(user_id).await?),

        Action::OpenChat(req) => {
            let req = checked(req)?;
            reply(
                services
                    .chats
                    .get_or_create_individual(user_id, &req.recipient_id)
                    .await?,
            )
        }
        Action::ListChats => reply(services.chats.list_chats(user_id).await?),
        Action::ClearChat(req) => {
            let req = checked(req)?;
            let chat_type = ChatType::parse(&req.chat_type)?;
            reply(services.chats.clear(user_id, chat_type, &req.chat_id).await?)
        }
        Action::ArchiveChat(req) => {
            let req = checked(req)?;
            reply(services.chats.archive(user_id, &req.chat_id).await?)
        }
        Action::UnarchiveChat(req) => {
            let req = checked(req)?;
            reply(services.chats.unarchive(user_id, &req.chat_id).await?)
        }
        Action::ResolveRecipient(req) => {
            let req = checked(req)?;
            let chat_type = ChatType::parse(&req.chat_type)?;
            reply(
                services
                    .chats
                    .resolve_recipient(user_id, chat_type, &req.chat_id)
                    .await?,
            )
        }

        Action::SendMessage(req) => {
            let req = checked(req)?;
            reply(
                services
                    .messages
                    .send(user_id, &req.chat_id, &req.content, req.content_kind)
                    .await?,
            )
        }
        Action::MarkDelivered(req) => {
            let req = checked(req)?;
            reply(
                services
                    .messages
                    .mark_delivered(user_id, &req.chat_id, &req.message_id)
                    .await?,
            )
        }
        Action::MarkRead(req) => {
            let req = checked(req)?;
            reply(
                services
                    .messages
                    .mark_read(user_id, &req.chat_id, &req.message_id)
                    .await?,
            )
        }
        Action::DeleteMessage(req) => {
            let req = checked(req)?;
            let scope = DeleteScope::parse(&req.scope)?;
            reply(
                services
                    .messages
                    .delete(user_id, &req.chat_id, &req.message_id, scope)
                    .await?,
            )
        }
        Action::ListMessages(req) => {
            let req = checked(req)?;
            reply(services.messages.list_messages(user_id, &req.chat_id).await?)
        }

        Action::CreateGroup(req) => {
            let req = checked(req)?;
            let group = NewGroup {
                name: req.name,
                description: req.description,
                photo: req.photo,
                participants: req.participants,
            };
            reply(services.groups.create(user_id, group).await?)
        }
        Action::EditGroup(req) => {
            let req = checked(req)?;
            let edit = GroupEdit {
                name: req.name,
                description: req.description,
                photo: req.photo,
                participants: req.participants,
            };
            reply(services.groups.edit(user_id, &req.group_id, edit).await?)
        }
        Action::LeaveGroup(req) => {
            let req = checked(req)?;
            reply(services.groups.leave(user_id, &req.group_id).await?)
        }
        Action::GetGroup(req) => {
            let req = checked(req)?;
            reply(services.groups.get_profile(user_id, &req.group_id).await?)
        }
        Action::ListGroups => reply(services.groups.list_groups(user_id).await?),

        Action::StartCall(req) => {
            let req = checked(req)?;
            reply(
                services
                    .calls
                    .start(user_id, &req.recipient_id, req.call_type)
                    .await?,
            )
        }
        Action::AcceptCall(req) => {
            let req = checked(req)?;
            reply(services.calls.accept(user_id, &req.call_id).await?)
        }
        Action::EndCall(req) => {
            let req = checked(req)?;
            reply(
                services
                    .calls
                    .end(user_id, &req.call_id, req.status, req.started_at)
                    .await?,
            )
        }
        Action::DeleteCall(req) => {
            let req = checked(req)?;
            reply(services.calls.delete(user_id, &req.call_id).await?)
        }
        Action::RelaySignal(req) => {
            let req = checked(req)?;
            reply(
                services
                    .calls
                    .relay_signal(user_id, &req.call_id, req.signal)
                    .await?,
            )
        }
        Action::CallLog => reply(services.calls.call_log(user_id).await?),
    }
}
