//! User account handlers
//!
//! Signup and login are public; `me` and the password change sit behind the
//! auth gate and read the caller from [`AuthenticatedUser`].

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::jwt::TokenPair;
use crate::auth::models::{
    ChangePasswordRequest, ChangePasswordResponse, InsertOneResult, LoginRequest, LoginResponse,
    RefreshRequest, SignupRequest, UserPublic,
};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::ValidateJson;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use std::sync::Arc;

/// Register a new user account
///
/// # Responses
///
/// * `200 OK` - `{"inserted_id": "<id>"}`
/// * `400 Bad Request` - Malformed or invalid body
/// * `409 Conflict` - Email or phone already registered
#[utoipa::path(
    post,
    path = "/users/signup",
    tag = "users",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User created", body = InsertOneResult),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Email or phone already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidateJson(request): ValidateJson<SignupRequest>,
) -> Result<Json<InsertOneResult>, AppError> {
    let email = request.email.clone();

    match state.auth.signup(request).await {
        Ok(result) => {
            audit_log(&AuditEvent::SignupSuccess {
                user_id: result.inserted_id.clone(),
                email,
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(Json(result))
        }
        Err(e) => {
            audit_log(&AuditEvent::SignupFailure {
                email,
                reason: e.to_string(),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(e)
        }
    }
}

/// Log in with email and password
///
/// Issues a new token pair, stores it on the user and returns the user
/// without the password hash.
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Email or password missing", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidateJson(request): ValidateJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = request.email.clone().unwrap_or_default();

    match state.auth.login(request).await {
        Ok(user) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: user.user_id.clone(),
                email,
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(Json(LoginResponse {
                user: user.to_public(),
            }))
        }
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                email,
                reason: e.to_string(),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(e)
        }
    }
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/users/refresh",
    tag = "users",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenPair),
        (status = 401, description = "Invalid, expired or superseded refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidateJson(request): ValidateJson<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let (user_id, tokens) = state.auth.refresh(&request.refresh_token).await?;

    audit_log(&AuditEvent::TokenRefresh {
        user_id,
        ip_address: extract_ip_address(&headers),
    });

    Ok(Json(tokens))
}

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = UserPublic),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 404, description = "User no longer exists", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<UserPublic>, AppError> {
    let user = state.auth.get_user(&caller.uid).await?;
    Ok(Json(user.to_public()))
}

/// Change the authenticated user's password
#[utoipa::path(
    put,
    path = "/users/{id}/password",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = ChangePasswordResponse),
        (status = 400, description = "Invalid id or body", body = crate::error::ApiError),
        (status = 401, description = "Current password is incorrect", body = crate::error::ApiError),
        (status = 403, description = "Not the caller's account", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 500, description = "Update failed", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(caller): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    ValidateJson(request): ValidateJson<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>, AppError> {
    let result = state.auth.change_password(&id, &caller.uid, request).await;

    audit_log(&AuditEvent::PasswordChange {
        user_id: caller.uid,
        success: result.is_ok(),
        reason: result.as_ref().err().map(|e| e.to_string()),
        ip_address: extract_ip_address(&headers),
    });

    result.map(Json)
}
