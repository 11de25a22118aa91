//! Authentication Handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::application::dto::request::SignInRequest;
use crate::application::services::AuthSession;
use crate::domain::Credentials;
use crate::shared::error::AppError;
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Sign in with an identity provider ID token.
///
/// Answers 201 when the sign-in created the user, 200 otherwise.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    validate(&body)?;

    let session = state
        .services
        .auth
        .sign_in(&Credentials {
            id_token: body.id_token,
        })
        .await?;

    let status = if session.is_new_user {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    tracing::info!(user_id = %session.user.id, new_user = session.is_new_user, "User signed in");
    Ok((status, Json(session)))
}
