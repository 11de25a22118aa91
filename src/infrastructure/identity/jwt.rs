//! HS256 identity provider.
//!
//! Sign-in credentials are ID tokens signed by the external identity provider
//! with a shared secret. Session tokens are signed with a separate secret
//! owned by this service.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{IdentitySettings, JwtSettings};
use crate::domain::{Credentials, IdentityProvider, IssuedToken, VerifiedIdentity};
use crate::shared::error::AppError;

/// Claims of an ID token presented at sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iss: String,
    pub exp: i64,
}

/// Claims of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Token id
    pub jti: String,
}

/// Identity provider backed by two HMAC secrets.
pub struct JwtIdentityProvider {
    session: JwtSettings,
    identity: IdentitySettings,
}

impl JwtIdentityProvider {
    pub fn new(session: JwtSettings, identity: IdentitySettings) -> Self {
        Self { session, identity }
    }

    fn validation(issuer: &str) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }

    fn rejected(e: jsonwebtoken::errors::Error) -> AppError {
        debug!(error = %e, "Token rejected");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Token expired".into())
            }
            _ => AppError::Unauthorized("Invalid token".into()),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<VerifiedIdentity, AppError> {
        let data = decode::<IdTokenClaims>(
            &credentials.id_token,
            &DecodingKey::from_secret(self.identity.secret.as_bytes()),
            &Self::validation(&self.identity.issuer),
        )
        .map_err(Self::rejected)?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() || claims.email.trim().is_empty() {
            return Err(AppError::Unauthorized("ID token lacks subject or email".into()));
        }

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email: claims.email,
            display_name: claims.name.filter(|n| !n.trim().is_empty()),
        })
    }

    fn issue_token(&self, user_id: &str) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.session.expiry_minutes);

        let claims = SessionClaims {
            sub: user_id.to_string(),
            iss: self.session.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.session.secret.as_bytes()),
        )
        .map_err(|e| AppError::Unexpected(format!("Token generation failed: {}", e)))?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer".to_string(),
            expires_at,
        })
    }

    fn verify_token(&self, token: &str) -> Result<String, AppError> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.session.secret.as_bytes()),
            &Self::validation(&self.session.issuer),
        )
        .map_err(Self::rejected)?;

        Ok(data.claims.sub)
    }
}
