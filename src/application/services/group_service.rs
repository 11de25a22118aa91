//! Group Service
//!
//! Group creation and edits, leaving, and admin continuity. Every mutating
//! operation answers with the materialized profile: the group joined with its
//! participants' user records and presence.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::chat_service::ChatService;
use super::notification_service::NotificationFanout;
use crate::application::dto::{ClientEvent, GroupProfile, ParticipantProfile, PhotoRef, Presence};
use crate::domain::{
    BlobStore, ConnectionRepository, Group, GroupPolicy, GroupRepository, GroupRole,
    UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::ids;

/// Blob store folder for group photos
const GROUP_PHOTO_FOLDER: &str = "groups";
/// Tag under which a group's photo is stored; re-uploads overwrite it
const GROUP_PHOTO_TAG: &str = "photo";

/// Input of a group create.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub photo: Option<PhotoRef>,
    pub participants: BTreeMap<String, GroupRole>,
}

/// Input of a group edit. The role map replaces the stored one.
#[derive(Debug, Clone)]
pub struct GroupEdit {
    pub name: String,
    pub description: Option<String>,
    /// `None` keeps the current photo
    pub photo: Option<PhotoRef>,
    pub participants: BTreeMap<String, GroupRole>,
}

/// Group service trait
#[async_trait]
pub trait GroupService: Send + Sync {
    async fn create(&self, user_id: &str, group: NewGroup) -> Result<GroupProfile, AppError>;

    async fn edit(
        &self,
        user_id: &str,
        group_id: &str,
        edit: GroupEdit,
    ) -> Result<GroupProfile, AppError>;

    async fn leave(&self, user_id: &str, group_id: &str) -> Result<GroupProfile, AppError>;

    /// Profile of a group the caller is listed in.
    async fn get_profile(&self, user_id: &str, group_id: &str) -> Result<GroupProfile, AppError>;

    /// Every group listing the caller, in any role.
    async fn list_groups(&self, user_id: &str) -> Result<Vec<GroupProfile>, AppError>;
}

/// GroupService implementation
pub struct GroupServiceImpl {
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    connections: Arc<dyn ConnectionRepository>,
    chats: Arc<dyn ChatService>,
    blobs: Arc<dyn BlobStore>,
    fanout: Arc<NotificationFanout>,
}

impl GroupServiceImpl {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
        connections: Arc<dyn ConnectionRepository>,
        chats: Arc<dyn ChatService>,
        blobs: Arc<dyn BlobStore>,
        fanout: Arc<NotificationFanout>,
    ) -> Self {
        Self {
            groups,
            users,
            connections,
            chats,
            blobs,
            fanout,
        }
    }

    async fn load_group(&self, group_id: &str) -> Result<Group, AppError> {
        self.groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Group {} not found", group_id)))
    }

    /// Resolve a supplied photo to the URL to store.
    async fn store_photo(&self, group_id: &str, photo: PhotoRef) -> Result<String, AppError> {
        match photo {
            PhotoRef::Url(url) => Ok(url),
            PhotoRef::Upload(bytes) => {
                self.blobs
                    .upload(group_id, GROUP_PHOTO_FOLDER, GROUP_PHOTO_TAG, bytes)
                    .await
            }
        }
    }

    /// New participants must be existing users and cannot join as Former.
    async fn check_new_participants(
        &self,
        roles: &BTreeMap<String, GroupRole>,
        new_ids: &[String],
    ) -> Result<(), AppError> {
        if let Some(id) = new_ids.iter().find(|id| roles.get(*id) == Some(&GroupRole::Former)) {
            return Err(AppError::bad_request(format!(
                "New participant {} cannot join as former",
                id
            )));
        }

        let found = self.users.find_by_ids(new_ids).await?;
        if let Some(missing) = new_ids.iter().find(|id| !found.iter().any(|u| &u.id == *id)) {
            return Err(AppError::bad_request(format!("User {} does not exist", missing)));
        }

        Ok(())
    }

    /// Join the role map against the user store and the connection registry.
    async fn materialize(&self, group: &Group) -> Result<GroupProfile, AppError> {
        let ids = group.listed_participants();
        let users: HashMap<String, _> = self
            .users
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut participants = Vec::with_capacity(ids.len());
        for (user_id, role) in &group.participants {
            let presence = Presence::from_entry(self.connections.find(user_id).await?.as_ref());
            let user = users.get(user_id);
            participants.push(ParticipantProfile {
                user_id: user_id.clone(),
                display_name: user.map(|u| u.display_name.clone()).unwrap_or_default(),
                photo_url: user.and_then(|u| u.photo_url.clone()),
                role: *role,
                online: presence.online,
                last_connection: presence.last_connection,
            });
        }

        Ok(GroupProfile {
            id: group.id.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
            photo_url: group.photo_url.clone(),
            creator_id: group.creator_id.clone(),
            chat_id: group.chat_id.clone(),
            created_at: group.created_at,
            participants,
        })
    }

    /// Materialize and tell every listed participant.
    async fn announce(&self, group: &Group) -> Result<GroupProfile, AppError> {
        let profile = self.materialize(group).await?;
        self.fanout
            .publish(
                &group.listed_participants(),
                &ClientEvent::GroupProfileChanged(profile.clone()),
            )
            .await;
        Ok(profile)
    }
}

fn check_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Group name cannot be empty"));
    }
    Ok(name.to_string())
}

#[async_trait]
impl GroupService for GroupServiceImpl {
    async fn create(&self, user_id: &str, new_group: NewGroup) -> Result<GroupProfile, AppError> {
        let name = check_name(&new_group.name)?;
        let roles = GroupPolicy::initial_roles(user_id, &new_group.participants);

        let others: Vec<String> = roles.keys().filter(|id| *id != user_id).cloned().collect();
        self.check_new_participants(&roles, &others).await?;

        let group_id = ids::new_id();
        let photo_url = match new_group.photo {
            Some(photo) => Some(self.store_photo(&group_id, photo).await?),
            None => None,
        };

        // Group first: its chat is only reachable through it.
        let group = Group {
            id: group_id,
            name,
            description: new_group.description,
            photo_url,
            participants: roles,
            creator_id: user_id.to_string(),
            chat_id: None,
            created_at: Utc::now(),
        };
        let mut group = self.groups.create(&group).await?;

        let chat = self.chats.create_group_chat(&group.id).await.map_err(|e| {
            tracing::error!(group_id = %group.id, error = %e, "Group created without a chat");
            e
        })?;
        group.chat_id = Some(chat.id);
        let group = self.groups.update(&group).await?;

        tracing::info!(
            group_id = %group.id,
            creator_id = %user_id,
            participants = group.participants.len(),
            "Group created"
        );

        self.announce(&group).await
    }

    async fn edit(
        &self,
        user_id: &str,
        group_id: &str,
        edit: GroupEdit,
    ) -> Result<GroupProfile, AppError> {
        let mut group = self.load_group(group_id).await?;
        if !group.is_admin(user_id) {
            return Err(AppError::forbidden("Only group admins can edit the group"));
        }

        let name = check_name(&edit.name)?;
        GroupPolicy::validate_edit(&group, &edit.participants)?;
        let added = GroupPolicy::added_participants(&group, &edit.participants);
        self.check_new_participants(&edit.participants, &added).await?;

        if let Some(photo) = edit.photo {
            group.photo_url = Some(self.store_photo(&group.id, photo).await?);
        }
        group.name = name;
        group.description = edit.description;
        group.participants = edit.participants;

        let promoted = GroupPolicy::ensure_admin(&mut group, &mut rand::rng());
        if let Some(promoted) = &promoted {
            tracing::info!(group_id = %group.id, user_id = %promoted, "Promoted participant to admin after edit");
        }

        let group = self.groups.update(&group).await?;
        tracing::debug!(group_id = %group.id, editor_id = %user_id, added = added.len(), "Group edited");

        self.announce(&group).await
    }

    async fn leave(&self, user_id: &str, group_id: &str) -> Result<GroupProfile, AppError> {
        let mut group = self.load_group(group_id).await?;
        if !group.is_active_participant(user_id) {
            return Err(AppError::forbidden("You are not a participant of this group"));
        }

        group.participants.insert(user_id.to_string(), GroupRole::Former);
        let promoted = GroupPolicy::ensure_admin(&mut group, &mut rand::rng());

        let group = self.groups.update(&group).await?;
        tracing::info!(
            group_id = %group.id,
            user_id = %user_id,
            promoted = ?promoted,
            "Participant left group"
        );

        self.announce(&group).await
    }

    async fn get_profile(&self, user_id: &str, group_id: &str) -> Result<GroupProfile, AppError> {
        let group = self.load_group(group_id).await?;
        if !group.is_listed(user_id) {
            return Err(AppError::forbidden("You are not a participant of this group"));
        }
        self.materialize(&group).await
    }

    async fn list_groups(&self, user_id: &str) -> Result<Vec<GroupProfile>, AppError> {
        let mut profiles = Vec::new();
        for group in self.groups.find_by_participant(user_id).await? {
            profiles.push(self.materialize(&group).await?);
        }
        Ok(profiles)
    }
}
