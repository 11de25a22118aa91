//! User entity and repository trait.
//!
//! Stored in the `users` document collection. A user document is owned by
//! the user and only mutated through that user's own requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Client colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the device setting
    #[default]
    System,
}

impl Theme {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(AppError::bad_request(format!("Unknown theme '{}'", other))),
        }
    }
}

/// Per-user client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserSettings {
    pub theme: Theme,

    /// Chat background identifier or image URL
    pub chat_background: Option<String>,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identity-provider subject; also the document id
    pub id: String,

    pub display_name: String,

    pub email: String,

    pub phone: Option<String>,

    pub biography: Option<String>,

    /// Public URL of the profile photo in the blob store
    pub photo_url: Option<String>,

    #[serde(default)]
    pub settings: UserSettings,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user record for a first sign-in.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
            phone: None,
            biography: None,
            photo_url: None,
            settings: UserSettings::default(),
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive display-name match used by user search.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        !query.is_empty()
            && (self.display_name.to_lowercase().contains(&query)
                || self.email.to_lowercase() == query)
    }
}

/// Repository trait for User data access operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Find every user in `ids` that exists. Missing ids are skipped.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError>;

    /// Users whose display name contains `query` (or whose email equals it).
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<User>, AppError>;

    /// Insert a new user document.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Replace an existing user document.
    async fn update(&self, user: &User) -> Result<User, AppError>;
}
