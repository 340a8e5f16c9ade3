/// Session lifecycle endpoints
///
/// This module provides the full credential lifecycle:
/// - Signup with email verification
/// - Signin issuing an access token plus an HttpOnly refresh cookie
/// - Access-token refresh and signout
/// - Password reset via emailed single-use links
///
/// # Endpoints
///
/// - `POST /v1/auth/signup` - Create an account, email a verification link
/// - `GET  /v1/auth/verify/:token` - Redeem a verification link
/// - `POST /v1/auth/resend-verification` - Re-issue the verification link
/// - `POST /v1/auth/signin` - Authenticate and start a session
/// - `POST /v1/auth/refresh` - Mint a new access token from the cookie
/// - `POST /v1/auth/signout` - Revoke the session and clear the cookie
/// - `POST /v1/auth/forgot-password` - Email a password-reset link
/// - `POST /v1/auth/reset-password/:token` - Redeem a reset link
///
/// # Enumeration resistance
///
/// `resend-verification` and `forgot-password` answer with the same generic
/// success message whether or not the email has an account. Signin answers
/// `INVALID_CREDENTIALS` for unknown email and wrong password alike, and
/// token redemption answers `INVALID_OR_EXPIRED_TOKEN` for every failure
/// cause.

use crate::{
    app::AppState,
    cookie,
    error::{validation_errors, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskipline_shared::{
    auth::{password, token},
    email::messages,
    models::user::{CreateUser, User},
};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    /// Password (plaintext; hashed before storage)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Signin request
#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Request carrying only an email (resend-verification, forgot-password)
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Reset-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Response carrying the account and a human-readable message
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: User,
}

/// Successful signin/refresh payload
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub access_token: String,
}

/// New access token after refresh
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Generic message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create an account and email a verification link
///
/// The account starts unverified; signin is refused until the emailed link
/// is redeemed.
///
/// # Errors
///
/// - `409 Conflict`: `EMAIL_ALREADY_EXISTS`
/// - `422 Unprocessable Entity`: `VALIDATION_ERROR`
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AccountResponse>)> {
    req.validate().map_err(validation_errors)?;

    let password_hash = password::hash_password(&req.password)?;

    // The unique index on email rejects duplicates; the sqlx From impl
    // turns that constraint violation into EMAIL_ALREADY_EXISTS.
    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
        },
    )
    .await?;

    issue_verification_link(&state, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "Account created. Check your email to verify your address.".to_string(),
            user,
        }),
    ))
}

/// Redeem an email-verification link
///
/// # Errors
///
/// - `400 Bad Request`: `INVALID_OR_EXPIRED_TOKEN` for unknown, expired,
///   and already-used secrets alike
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<AccountResponse>> {
    let digest = token::digest_secret(&token);

    let user = User::consume_verification_challenge(&state.db, &digest)
        .await?
        .ok_or_else(ApiError::invalid_token)?;

    state
        .send_email(messages::welcome(
            &user.email,
            &user.first_name,
            &state.config.api.client_url,
        ))
        .await;

    Ok(Json(AccountResponse {
        message: "Email verified. You can now sign in.".to_string(),
        user,
    }))
}

/// Re-issue the verification link
///
/// Always answers with the same generic message; a fresh link is emailed
/// only when the account exists and is still unverified. Issuing a new
/// secret invalidates the previous one.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate().map_err(validation_errors)?;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        if !user.is_verified {
            issue_verification_link(&state, &user).await?;
        }
    }

    Ok(Json(MessageResponse {
        message: "If an account with that email exists, a verification link has been sent."
            .to_string(),
    }))
}

/// Authenticate and start a session
///
/// On success the refresh token is persisted as the account's single live
/// session and delivered in an HttpOnly cookie; the access token comes
/// back in the body.
///
/// # Errors
///
/// - `401 Unauthorized`: `INVALID_CREDENTIALS` for unknown email and wrong
///   password alike
/// - `403 Forbidden`: `FORBIDDEN_UNVERIFIED` when the password is correct
///   but the email was never verified
pub async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(validation_errors)?;

    let user = User::find_by_email_with_secrets(&state.db, &req.email)
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::invalid_credentials());
    }

    if !user.is_verified {
        return Err(ApiError::unverified());
    }

    let auth = &state.config.auth;
    let access_token = token::issue_session_token(user.id, &auth.access_secret, auth.access_lifetime)?;
    let refresh_token =
        token::issue_session_token(user.id, &auth.refresh_secret, auth.refresh_lifetime)?;

    // One live session per account: this overwrite revokes any previous
    // refresh token.
    User::set_refresh_token(&state.db, user.id, Some(&refresh_token)).await?;

    let cookie = cookie::refresh_cookie(
        &refresh_token,
        auth.refresh_lifetime,
        state.config.api.production,
    );

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(SessionResponse {
            user: user.into_public(),
            access_token,
        }),
    ))
}

/// Mint a new access token from the refresh cookie
///
/// The presented token must verify against the refresh secret AND match
/// the stored session token exactly; a token revoked by signout or
/// superseded by a newer signin is refused. The refresh token itself is
/// not rotated here.
///
/// # Errors
///
/// - `401 Unauthorized`: `UNAUTHENTICATED` for every failure cause
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<RefreshResponse>> {
    let presented =
        cookie::refresh_token_from_headers(&headers).ok_or_else(ApiError::unauthenticated)?;

    let claims = token::verify_session_token(&presented, &state.config.auth.refresh_secret)
        .ok_or_else(ApiError::unauthenticated)?;

    let user = User::find_by_id_with_secrets(&state.db, claims.sub)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    let stored = user.refresh_token.ok_or_else(ApiError::unauthenticated)?;
    if !token::digests_equal(&stored, &presented) {
        return Err(ApiError::unauthenticated());
    }

    let auth = &state.config.auth;
    let access_token = token::issue_session_token(user.id, &auth.access_secret, auth.access_lifetime)?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Revoke the session and clear the refresh cookie
///
/// Succeeds regardless of cookie state; the stored refresh token is
/// cleared only when the cookie still verifies.
pub async fn signout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(presented) = cookie::refresh_token_from_headers(&headers) {
        if let Some(claims) =
            token::verify_session_token(&presented, &state.config.auth.refresh_secret)
        {
            User::set_refresh_token(&state.db, claims.sub, None).await?;
        }
    }

    let cookie = cookie::clear_refresh_cookie(state.config.api.production);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            message: "Signed out.".to_string(),
        }),
    ))
}

/// Email a password-reset link
///
/// Always answers with the same generic message; the link is emailed only
/// when the account exists. Issuing a new secret invalidates the previous
/// one.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate().map_err(validation_errors)?;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        let (plaintext, digest) = token::issue_opaque_secret(token::PASSWORD_RESET_TOKEN_BYTES);
        let expires_at = Utc::now() + state.config.auth.reset_ttl;

        User::set_reset_challenge(&state.db, user.id, &digest, expires_at).await?;

        let reset_url = format!(
            "{}/reset-password/{}",
            state.config.api.client_url, plaintext
        );
        state
            .send_email(messages::password_reset(
                &user.email,
                &user.first_name,
                &reset_url,
            ))
            .await;
    }

    Ok(Json(MessageResponse {
        message: "If an account with that email exists, a password reset link has been sent."
            .to_string(),
    }))
}

/// Redeem a password-reset link
///
/// On success the new password hash is installed, the challenge is
/// consumed, and the account's refresh token is revoked so existing
/// sessions die with the old password.
///
/// # Errors
///
/// - `400 Bad Request`: `INVALID_OR_EXPIRED_TOKEN` for unknown, expired,
///   and already-used secrets alike
/// - `422 Unprocessable Entity`: `VALIDATION_ERROR`
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate().map_err(validation_errors)?;

    let new_hash = password::hash_password(&req.password)?;
    let digest = token::digest_secret(&token);

    let user = User::consume_reset_challenge(&state.db, &digest, &new_hash)
        .await?
        .ok_or_else(ApiError::invalid_token)?;

    User::set_refresh_token(&state.db, user.id, None).await?;

    state
        .send_email(messages::password_reset_success(
            &user.email,
            &user.first_name,
        ))
        .await;

    Ok(Json(MessageResponse {
        message: "Password updated. You can now sign in with your new password.".to_string(),
    }))
}

/// Issues a fresh verification secret, stores its digest, and emails the
/// plaintext link.
async fn issue_verification_link(state: &AppState, user: &User) -> Result<(), ApiError> {
    let (plaintext, digest) = token::issue_opaque_secret(token::VERIFICATION_TOKEN_BYTES);
    let expires_at = Utc::now() + state.config.auth.verification_ttl;

    User::set_verification_challenge(&state.db, user.id, &digest, expires_at).await?;

    let verify_url = format!("{}/verify/{}", state.config.api.client_url, plaintext);
    state
        .send_email(messages::verification(
            &user.email,
            &user.first_name,
            &verify_url,
        ))
        .await;

    Ok(())
}
