/// Account management endpoints
///
/// All routes here sit behind the access-token middleware; the caller's id
/// comes from the [`AuthUser`] request extension, never from the payload.
///
/// # Endpoints
///
/// - `GET    /v1/users/me` - Current account
/// - `PATCH  /v1/users/profile` - Update name fields
/// - `PATCH  /v1/users/preferences` - Update preference flags
/// - `PATCH  /v1/users/change-password` - Rotate the password
/// - `DELETE /v1/users/account` - Delete the account and all its data

use crate::{
    app::{AppState, AuthUser},
    cookie,
    error::{validation_errors, ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskipline_shared::{
    auth::password,
    email::messages,
    graph,
    models::user::User,
};
use validator::Validate;

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,
}

/// Preferences update request
#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub email_notifications: Option<bool>,
    pub ai_features_enabled: Option<bool>,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Account deletion request
#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    /// Current password, re-checked before the purge
    pub password: String,
}

/// Generic message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Current account
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    Ok(Json(user))
}

/// Update name fields; absent fields keep their current value
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    req.validate().map_err(validation_errors)?;

    let user = User::update_profile(
        &state.db,
        auth.user_id,
        req.first_name.as_deref(),
        req.last_name.as_deref(),
    )
    .await?
    .ok_or_else(ApiError::user_not_found)?;

    Ok(Json(user))
}

/// Update preference flags; absent fields keep their current value
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> ApiResult<Json<User>> {
    let user = User::update_preferences(
        &state.db,
        auth.user_id,
        req.email_notifications,
        req.ai_features_enabled,
    )
    .await?
    .ok_or_else(ApiError::user_not_found)?;

    Ok(Json(user))
}

/// Rotate the password
///
/// Requires the current password. On success the refresh token is revoked
/// and the cookie cleared: every session dies with the old password and
/// the user signs in again.
///
/// # Errors
///
/// - `401 Unauthorized`: `INVALID_CREDENTIALS` when the current password
///   is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(validation_errors)?;

    let user = User::find_by_id_with_secrets(&state.db, auth.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let valid = password::verify_password(&req.current_password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::invalid_credentials());
    }

    let new_hash = password::hash_password(&req.new_password)?;
    User::set_password_hash(&state.db, user.id, &new_hash).await?;
    User::set_refresh_token(&state.db, user.id, None).await?;

    let cookie = cookie::clear_refresh_cookie(state.config.api.production);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            message: "Password changed. Please sign in again.".to_string(),
        }),
    ))
}

/// Delete the account and all of its goals and tasks
///
/// Requires the current password. The purge runs in one transaction; a
/// farewell email goes out after the commit, best-effort.
///
/// # Errors
///
/// - `401 Unauthorized`: `INVALID_CREDENTIALS` when the password is wrong
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DeleteAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_id_with_secrets(&state.db, auth.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::invalid_credentials());
    }

    let user = user.into_public();
    graph::purge_user(&state.db, user.id).await?;

    state
        .send_email(messages::account_deleted(&user.email, &user.first_name))
        .await;

    let cookie = cookie::clear_refresh_cookie(state.config.api.production);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            message: "Account deleted.".to_string(),
        }),
    ))
}
