//! Application Services
//!
//! The coordinators. Each takes the caller's identity plus the operation's
//! input, reads what it needs from the persistent store, applies the state
//! transition, writes it back and hands the result to the fan-out.
//!
//! ## Available Services
//!
//! - **PresenceService**: Connection registry and presence broadcasts
//! - **MessageService**: Message ledger (send, delivered/read, delete)
//! - **ChatService**: Individual chat dedup, archive, clear, recipients
//! - **GroupService**: Group create/edit/leave and admin continuity
//! - **CallService**: Call lifecycle, busy detection, signaling relay
//! - **NotificationFanout**: User-scoped delivery to live connections
//! - **AuthService**: Sign-in through the identity provider
//! - **UserService**: Own profile, settings, photo and user search

mod access;
pub mod auth_service;
pub mod call_service;
pub mod chat_service;
pub mod group_service;
pub mod message_service;
pub mod notification_service;
pub mod presence_service;
pub mod user_service;

use std::sync::Arc;

use crate::domain::{BlobStore, FanoutTransport, IdentityProvider, Repositories};

pub use access::{ChatAccess, ChatAccessResolver};
pub use auth_service::{AuthService, AuthServiceImpl, AuthSession};
pub use call_service::{CallService, CallServiceImpl};
pub use chat_service::{ChatService, ChatServiceImpl};
pub use group_service::{GroupEdit, GroupService, GroupServiceImpl, NewGroup};
pub use message_service::{MessageService, MessageServiceImpl};
pub use notification_service::{FanoutReport, NotificationFanout};
pub use presence_service::{PresenceService, PresenceServiceImpl};
pub use user_service::{ProfileUpdate, SettingsUpdate, UserService, UserServiceImpl};

/// Every coordinator, wired against one set of repositories and
/// collaborators.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub users: Arc<dyn UserService>,
    pub presence: Arc<dyn PresenceService>,
    pub chats: Arc<dyn ChatService>,
    pub messages: Arc<dyn MessageService>,
    pub groups: Arc<dyn GroupService>,
    pub calls: Arc<dyn CallService>,
    pub fanout: Arc<NotificationFanout>,
}

impl Services {
    pub fn new(
        repos: &Repositories,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
        transport: Arc<dyn FanoutTransport>,
    ) -> Self {
        let fanout = Arc::new(NotificationFanout::new(repos.connections.clone(), transport));

        let presence: Arc<dyn PresenceService> = Arc::new(PresenceServiceImpl::new(
            repos.connections.clone(),
            fanout.clone(),
        ));

        let chats: Arc<dyn ChatService> = Arc::new(ChatServiceImpl::new(
            repos.chats.clone(),
            repos.messages.clone(),
            repos.groups.clone(),
            repos.users.clone(),
            fanout.clone(),
        ));

        let messages: Arc<dyn MessageService> = Arc::new(MessageServiceImpl::new(
            repos.messages.clone(),
            ChatAccessResolver::new(repos.chats.clone(), repos.groups.clone()),
            fanout.clone(),
        ));

        let groups: Arc<dyn GroupService> = Arc::new(GroupServiceImpl::new(
            repos.groups.clone(),
            repos.users.clone(),
            repos.connections.clone(),
            chats.clone(),
            blobs.clone(),
            fanout.clone(),
        ));

        let calls: Arc<dyn CallService> = Arc::new(CallServiceImpl::new(
            repos.calls.clone(),
            repos.users.clone(),
            fanout.clone(),
        ));

        let auth: Arc<dyn AuthService> =
            Arc::new(AuthServiceImpl::new(repos.users.clone(), identity));

        let users: Arc<dyn UserService> = Arc::new(UserServiceImpl::new(
            repos.users.clone(),
            presence.clone(),
            blobs,
        ));

        Self {
            auth,
            users,
            presence,
            chats,
            messages,
            groups,
            calls,
            fanout,
        }
    }
}
