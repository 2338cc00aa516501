//! Data models for authentication
//!
//! This module defines the core data structures for the auth system:
//! - User: the stored identity document
//! - UserPublic: the projection returned to clients
//! - Request and response bodies for the user endpoints

use super::password::validate_password_strength;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User account document
///
/// `id` is the document key; `user_id` is the string form of `id` kept as a
/// separately indexed field and embedded in tokens as `uid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,

    /// Argon2id PHC string, never serialized in API responses
    #[serde(skip_serializing)]
    pub password: String,

    /// Current access token
    pub token: Option<String>,
    /// Current refresh token
    pub refresh_token: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh identifier and timestamps
    ///
    /// Tokens are attached separately once they have been signed for the
    /// new `user_id`.
    pub fn new(
        first_name: String,
        last_name: String,
        email: String,
        phone: String,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Self {
            id,
            user_id: id.to_string(),
            first_name,
            last_name,
            email,
            phone,
            password: password_hash,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert user to public representation (without the password hash)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            user_id: self.user_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            token: self.token.clone(),
            refresh_token: self.refresh_token.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public user representation (safe for API responses)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signup request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 2, max = 100))]
    pub first_name: String,
    #[validate(length(min = 2, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
}

/// Login request body
///
/// Both fields are optional at the parsing level so a missing one is
/// reported with a dedicated message instead of a decoding error.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Token refresh request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Password change request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub new_password: String,
}

/// Result of inserting a document
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InsertOneResult {
    pub inserted_id: String,
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserPublic,
}

/// Password change response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordResponse {
    pub id: String,
    pub message: String,
    pub updated: u64,
}
