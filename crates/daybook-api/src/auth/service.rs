//! Authentication service layer
//!
//! Provides the business logic for signup, login, token refresh and password
//! changes on top of a [`UserRepository`]. Handlers stay thin: they extract
//! and validate the request, call one method here and shape the response.

use super::jwt::{generate_all_tokens, validate_refresh_token, JwtConfig, TokenPair};
use super::models::{
    ChangePasswordRequest, ChangePasswordResponse, InsertOneResult, LoginRequest, SignupRequest,
    User,
};
use super::password::{hash_password, verify_password, PasswordConfig};
use super::repository::{RepositoryError, UserFilter, UserRepository, UserUpdate};
use crate::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Message for every credential mismatch on login
pub const INVALID_CREDENTIALS: &str = "login or password is incorrect";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: JwtConfig,
    password: PasswordConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtConfig, password: PasswordConfig) -> Self {
        Self {
            users,
            jwt,
            password,
        }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Register a new user
    ///
    /// Checks run in a fixed order: email uniqueness, password hashing,
    /// phone uniqueness. Nothing is written until all of them pass.
    ///
    /// # Returns
    ///
    /// * `Ok(InsertOneResult)` - Id of the new user document
    /// * `Err(AppError::Conflict)` - Email or phone already registered
    pub async fn signup(&self, request: SignupRequest) -> Result<InsertOneResult, AppError> {
        let email_count = self
            .users
            .count(&UserFilter::Email(request.email.clone()))
            .await?;
        if email_count > 0 {
            return Err(AppError::Conflict("This email already exists".to_string()));
        }

        let password_hash = self.hash(request.password).await?;

        let phone_count = self
            .users
            .count(&UserFilter::Phone(request.phone.clone()))
            .await?;
        if phone_count > 0 {
            return Err(AppError::Conflict(
                "This phone number already exists".to_string(),
            ));
        }

        let mut user = User::new(
            request.first_name,
            request.last_name,
            request.email,
            request.phone,
            password_hash,
        );

        let tokens = generate_all_tokens(
            &self.jwt,
            &user.email,
            &user.first_name,
            &user.last_name,
            &user.user_id,
        )?;
        user.token = Some(tokens.token);
        user.refresh_token = Some(tokens.refresh_token);

        let result = self.users.insert_one(&user).await.map_err(|e| match e {
            // Lost a race with a concurrent signup on the unique indexes
            RepositoryError::Duplicate(_) => {
                AppError::Conflict("This email or phone number already exists".to_string())
            }
            other => AppError::from(other),
        })?;

        tracing::info!(user_id = %user.user_id, "user created");
        Ok(result)
    }

    /// Authenticate a user and rotate their tokens
    ///
    /// Unknown email and wrong password fail identically.
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - The user carrying the freshly issued tokens
    /// * `Err(AppError::BadRequest)` - Email or password missing
    /// * `Err(AppError::Unauthorized)` - Invalid credentials
    pub async fn login(&self, request: LoginRequest) -> Result<User, AppError> {
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(AppError::BadRequest(
                "Email and password are required".to_string(),
            ));
        };

        let Some(mut user) = self.users.find_one(&UserFilter::Email(email)).await? else {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !self.verify(password, user.password.clone()).await? {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let tokens = generate_all_tokens(
            &self.jwt,
            &user.email,
            &user.first_name,
            &user.last_name,
            &user.user_id,
        )?;
        self.update_all_tokens(&user.user_id, &tokens.token, &tokens.refresh_token)
            .await?;

        user.token = Some(tokens.token);
        user.refresh_token = Some(tokens.refresh_token);
        Ok(user)
    }

    /// Exchange the current refresh token for a new token pair
    ///
    /// Only the most recently issued refresh token is accepted; any earlier
    /// one is rejected even if it has not expired yet. The write only lands
    /// if the presented token is still the stored one, so concurrent
    /// refreshes with the same token yield exactly one new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(String, TokenPair), AppError> {
        let claims = validate_refresh_token(&self.jwt, refresh_token)?;

        let user = self
            .users
            .find_one(&UserFilter::UserId(claims.uid.clone()))
            .await?
            .ok_or_else(|| AppError::Unauthorized("the token is invalid".to_string()))?;

        if user.refresh_token.as_deref() != Some(refresh_token) {
            return Err(superseded());
        }

        let tokens = generate_all_tokens(
            &self.jwt,
            &user.email,
            &user.first_name,
            &user.last_name,
            &user.user_id,
        )?;
        let result = self
            .users
            .update_one(
                &UserFilter::UserIdAndRefreshToken {
                    user_id: user.user_id.clone(),
                    refresh_token: refresh_token.to_string(),
                },
                UserUpdate::tokens(tokens.token.clone(), tokens.refresh_token.clone()),
            )
            .await?;

        if result.modified_count == 0 {
            tracing::warn!(user_id = %user.user_id, "refresh lost a rotation race");
            return Err(superseded());
        }

        tracing::debug!(user_id = %user.user_id, "tokens rotated");
        Ok((user.user_id, tokens))
    }

    /// Change the password of the authenticated user
    ///
    /// # Arguments
    ///
    /// * `id` - User id from the request path
    /// * `uid` - User id of the authenticated caller
    /// * `request` - Current and new password
    pub async fn change_password(
        &self,
        id: &str,
        uid: &str,
        request: ChangePasswordRequest,
    ) -> Result<ChangePasswordResponse, AppError> {
        Uuid::parse_str(id).map_err(|_| AppError::BadRequest(format!("invalid user id: {id}")))?;

        if id != uid {
            return Err(AppError::Forbidden(
                "cannot change another user's password".to_string(),
            ));
        }

        let user = self
            .users
            .find_one(&UserFilter::UserId(id.to_string()))
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

        if !self
            .verify(request.current_password, user.password.clone())
            .await?
        {
            return Err(AppError::Unauthorized(
                "current password is incorrect".to_string(),
            ));
        }

        let new_hash = self.hash(request.new_password).await?;
        let result = self
            .users
            .update_one(
                &UserFilter::UserId(user.user_id.clone()),
                UserUpdate::password(new_hash),
            )
            .await?;

        if result.modified_count == 0 {
            return Err(AppError::Internal(
                "Password update failed - no documents modified".to_string(),
            ));
        }

        Ok(ChangePasswordResponse {
            id: user.user_id,
            message: "Password updated successfully!".to_string(),
            updated: result.modified_count,
        })
    }

    /// Load a user by secondary id
    pub async fn get_user(&self, uid: &str) -> Result<User, AppError> {
        self.users
            .find_one(&UserFilter::UserId(uid.to_string()))
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }

    /// Persist a freshly issued token pair onto the user document
    pub async fn update_all_tokens(
        &self,
        user_id: &str,
        token: &str,
        refresh_token: &str,
    ) -> Result<(), AppError> {
        let result = self
            .users
            .update_one(
                &UserFilter::UserId(user_id.to_string()),
                UserUpdate::tokens(token.to_string(), refresh_token.to_string()),
            )
            .await?;

        if result.modified_count == 0 {
            return Err(AppError::Internal("no document was updated".to_string()));
        }

        tracing::debug!(user_id = %user_id, "tokens persisted");
        Ok(())
    }

    /// Check the user store is reachable
    pub async fn ping(&self) -> Result<(), AppError> {
        self.users.ping().await.map_err(AppError::from)
    }

    async fn hash(&self, password: String) -> Result<String, AppError> {
        let config = self.password.clone();
        let hash = tokio::task::spawn_blocking(move || hash_password(&password, &config)).await??;
        Ok(hash)
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await??;
        Ok(matches)
    }
}

fn superseded() -> AppError {
    AppError::Unauthorized("refresh token has been superseded".to_string())
}
