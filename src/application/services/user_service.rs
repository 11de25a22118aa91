//! User Service
//!
//! Own-profile reads and updates, profile photo upload and user search.

use std::sync::Arc;

use async_trait::async_trait;

use super::presence_service::PresenceService;
use crate::application::dto::UserProfile;
use crate::domain::{BlobStore, Theme, User, UserRepository};
use crate::shared::error::AppError;

/// Blob store folder for profile photos
const USER_PHOTO_FOLDER: &str = "users";
const USER_PHOTO_TAG: &str = "profile";

/// Default and maximum search result count
pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 50;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// Profile of `user_id` as seen by `viewer_id`.
    async fn get_profile(&self, viewer_id: &str, user_id: &str) -> Result<UserProfile, AppError>;

    /// Update own profile fields
    async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<UserProfile, AppError>;

    /// Update own settings
    async fn update_settings(
        &self,
        user_id: &str,
        update: SettingsUpdate,
    ) -> Result<UserProfile, AppError>;

    /// Replace own profile photo
    async fn update_photo(&self, user_id: &str, bytes: Vec<u8>) -> Result<UserProfile, AppError>;

    /// Users matching `query`, excluding the caller
    async fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<UserProfile>, AppError>;
}

/// Update profile fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub biography: Option<String>,
    pub phone: Option<String>,
}

/// Update settings; `None` leaves a setting unchanged
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub theme: Option<Theme>,
    pub chat_background: Option<String>,
}

/// UserService implementation
pub struct UserServiceImpl {
    users: Arc<dyn UserRepository>,
    presence: Arc<dyn PresenceService>,
    blobs: Arc<dyn BlobStore>,
}

impl UserServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        presence: Arc<dyn PresenceService>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            users,
            presence,
            blobs,
        }
    }

    async fn load_user(&self, user_id: &str) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {} not found", user_id)))
    }

    async fn profile(&self, user: User, include_private: bool) -> Result<UserProfile, AppError> {
        let presence = self.presence.presence_of(&user.id).await?;
        Ok(UserProfile::from_user(user, presence, include_private))
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn get_profile(&self, viewer_id: &str, user_id: &str) -> Result<UserProfile, AppError> {
        let user = self.load_user(user_id).await?;
        self.profile(user, viewer_id == user_id).await
    }

    async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<UserProfile, AppError> {
        let mut user = self.load_user(user_id).await?;

        if let Some(display_name) = update.display_name {
            let display_name = display_name.trim();
            if display_name.is_empty() {
                return Err(AppError::bad_request("Display name cannot be empty"));
            }
            user.display_name = display_name.to_string();
        }
        if let Some(biography) = update.biography {
            user.biography = Some(biography).filter(|b| !b.is_empty());
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone).filter(|p| !p.is_empty());
        }

        let user = self.users.update(&user).await?;
        tracing::debug!(user_id = %user_id, "Profile updated");
        self.profile(user, true).await
    }

    async fn update_settings(
        &self,
        user_id: &str,
        update: SettingsUpdate,
    ) -> Result<UserProfile, AppError> {
        let mut user = self.load_user(user_id).await?;

        if let Some(theme) = update.theme {
            user.settings.theme = theme;
        }
        if let Some(background) = update.chat_background {
            user.settings.chat_background = Some(background).filter(|b| !b.is_empty());
        }

        let user = self.users.update(&user).await?;
        self.profile(user, true).await
    }

    async fn update_photo(&self, user_id: &str, bytes: Vec<u8>) -> Result<UserProfile, AppError> {
        let mut user = self.load_user(user_id).await?;

        let url = self
            .blobs
            .upload(user_id, USER_PHOTO_FOLDER, USER_PHOTO_TAG, bytes)
            .await?;
        user.photo_url = Some(url);

        let user = self.users.update(&user).await?;
        tracing::debug!(user_id = %user_id, "Profile photo updated");
        self.profile(user, true).await
    }

    async fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<UserProfile>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::bad_request("Search query cannot be empty"));
        }
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

        // One extra so the caller can be dropped without shrinking the page
        let users = self.users.search(query, limit + 1).await?;

        let mut profiles = Vec::with_capacity(limit);
        for user in users.into_iter().filter(|u| u.id != user_id).take(limit) {
            profiles.push(self.profile(user, false).await?);
        }
        Ok(profiles)
    }
}
