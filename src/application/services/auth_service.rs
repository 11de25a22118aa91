//! Authentication Service
//!
//! Signs users in through the identity provider and authorizes session
//! tokens at the transport boundary.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Credentials, IdentityProvider, IssuedToken, User, UserRepository};
use crate::shared::error::AppError;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify credentials, creating the user on their first sign-in.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AppError>;

    /// Validate a session token and extract the user id.
    fn authorize(&self, token: &str) -> Result<String, AppError>;
}

/// A signed-in session.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub token: IssuedToken,
    /// True when this sign-in created the user
    pub is_new_user: bool,
}

/// AuthService implementation
pub struct AuthServiceImpl {
    users: Arc<dyn UserRepository>,
    identity: Arc<dyn IdentityProvider>,
}

impl AuthServiceImpl {
    /// Create a new AuthServiceImpl
    pub fn new(users: Arc<dyn UserRepository>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { users, identity }
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AppError> {
        let identity = self.identity.authenticate(credentials).await?;

        let (user, is_new_user) = match self.users.find_by_id(&identity.subject).await? {
            Some(user) => (user, false),
            None => {
                let display_name = identity
                    .display_name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| default_display_name(&identity.email));
                let user = User::new(identity.subject.clone(), display_name, identity.email.clone());
                let user = self.users.create(&user).await?;
                tracing::info!(user_id = %user.id, "User registered on first sign-in");
                (user, true)
            }
        };

        let token = self.identity.issue_token(&user.id)?;
        tracing::debug!(user_id = %user.id, "User signed in");

        Ok(AuthSession {
            user,
            token,
            is_new_user,
        })
    }

    fn authorize(&self, token: &str) -> Result<String, AppError> {
        self.identity.verify_token(token)
    }
}

/// Local part of the email address.
fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
