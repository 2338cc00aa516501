//! Authentication middleware for protecting routes
//!
//! Extracts and validates the access token of every request to a protected
//! route. On success the caller's identity is added to the request
//! extensions; on failure the request is answered with 401 and the handler
//! never runs.

use super::jwt::{validate_access_token, JwtError, SignedDetails};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Header carrying a raw token, accepted alongside `Authorization: Bearer`
pub const TOKEN_HEADER: &str = "token";

/// Authenticated user information extracted from the access token
///
/// Handlers read it with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Secondary user id
    pub uid: String,
}

impl From<SignedDetails> for AuthenticatedUser {
    fn from(claims: SignedDetails) -> Self {
        Self {
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
            uid: claims.uid,
        }
    }
}

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No Authorization header provided")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("{0}")]
    InvalidToken(#[from] JwtError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Pull the raw token out of the request headers
///
/// `Authorization: Bearer <token>` wins; the bare `token` header is the
/// fallback.
pub fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
        // Auth schemes are case-insensitive
        return value
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
            .map(|(_, token)| token.trim())
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader);
    }

    match headers.get(TOKEN_HEADER) {
        Some(value) => value
            .to_str()
            .map(str::trim)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader),
        None => Err(AuthError::MissingAuthHeader),
    }
}

/// Authentication middleware that requires a valid access token
///
/// This middleware:
/// 1. Reads the token from `Authorization: Bearer` or the `token` header
/// 2. Validates signature, expiry and token type
/// 3. Adds [`AuthenticatedUser`] to request extensions
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
///
/// let protected = Router::new()
///     .route("/users/me", get(me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_token(request.headers())?;

    let claims = match validate_access_token(state.auth.jwt(), token) {
        Ok(c) => c,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
                reason: e.to_string(),
            });
            return Err(AuthError::InvalidToken(e));
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}
