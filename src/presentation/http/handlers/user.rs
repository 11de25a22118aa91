//! User Handlers

use axum::{
    body::Bytes,
    extract::{Extension, Query, State},
    Json,
};

use crate::application::dto::request::{SearchUsersQuery, UpdateProfileRequest, UpdateSettingsRequest};
use crate::application::dto::UserProfile;
use crate::application::services::{ProfileUpdate, SettingsUpdate};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Get current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state
        .services
        .users
        .get_profile(&auth.user_id, &auth.user_id)
        .await?;
    Ok(Json(profile))
}

/// Update current user profile
pub async fn update_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    validate(&body)?;

    let update = ProfileUpdate {
        display_name: body.display_name,
        biography: body.biography,
        phone: body.phone,
    };

    let profile = state.services.users.update_profile(&auth.user_id, update).await?;
    Ok(Json(profile))
}

/// Update current user settings
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<UserProfile>, AppError> {
    validate(&body)?;

    let update = SettingsUpdate {
        theme: body.theme,
        chat_background: body.chat_background,
    };

    let profile = state.services.users.update_settings(&auth.user_id, update).await?;
    Ok(Json(profile))
}

/// Replace the profile photo with the raw request body
pub async fn update_photo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state
        .services
        .users
        .update_photo(&auth.user_id, body.to_vec())
        .await?;
    Ok(Json(profile))
}

/// Search users by display name
pub async fn search_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    validate(&query)?;

    let users = state
        .services
        .users
        .search(&auth.user_id, &query.q, query.limit)
        .await?;
    Ok(Json(users))
}
