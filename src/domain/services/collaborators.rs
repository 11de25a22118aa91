//! Contracts of the external collaborators the coordinators call.
//!
//! - **IdentityProvider**: verifies credentials and issues session tokens
//! - **BlobStore**: stores uploaded photos and hands back a public URL
//! - **FanoutTransport**: pushes one event to one live connection

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Credentials presented at sign-in: an ID token minted by the identity
/// provider. Never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub id_token: String,
}

/// Identity extracted from verified credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Stable subject id; becomes the user id
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// A session token handed to a client.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Identity provider contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify sign-in credentials.
    async fn authenticate(&self, credentials: &Credentials) -> Result<VerifiedIdentity, AppError>;

    /// Issue a session token for a user.
    fn issue_token(&self, user_id: &str) -> Result<IssuedToken, AppError>;

    /// Verify a session token and return the user id it was issued to.
    fn verify_token(&self, token: &str) -> Result<String, AppError>;
}

/// Blob storage contract.
///
/// Uploads under the same `(folder, owner_key, tag)` overwrite each other.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the public URL.
    async fn upload(
        &self,
        owner_key: &str,
        folder: &str,
        tag: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError>;
}

/// Delivery of one serialized event to one live connection.
pub trait FanoutTransport: Send + Sync {
    /// Returns false when the connection is gone.
    fn send_to_connection(
        &self,
        connection_id: &str,
        event_name: &str,
        payload: &serde_json::Value,
    ) -> bool;
}
