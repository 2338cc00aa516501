//! JWT token generation and validation
//!
//! Implements JWT-based authentication with HMAC-SHA256 signing.
//! Every login issues an access token and a refresh token; both carry the
//! user's identity and differ in lifetime and `token_type`.

use daybook_core::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use utoipa::ToSchema;

/// Kind of token, embedded so one can never stand in for the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims signed into every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDetails {
    /// User's email address
    pub email: String,
    /// User's first name
    pub first_name: String,
    /// User's last name
    pub last_name: String,
    /// Secondary user id (the `user_id` field of the user document)
    pub uid: String,
    /// Access or refresh
    pub token_type: TokenType,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

/// Freshly signed access/refresh pair
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("failed to sign token: {0}")]
    Encoding(jsonwebtoken::errors::Error),

    #[error("the token is invalid")]
    InvalidToken,

    #[error("token is expired")]
    Expired,

    #[error("signature is invalid")]
    InvalidSignature,

    #[error("expected {expected:?} token")]
    WrongTokenType { expected: TokenType },

    #[error("system time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),
}

/// JWT Configuration
///
/// Built once from [`AuthConfig`] and shared through the application state.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Access token lifetime in seconds (default: 24 hours)
    pub access_expiration_secs: u64,
    /// Refresh token lifetime in seconds (default: 168 hours)
    pub refresh_expiration_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_expiration_secs: 24 * 3600,
            refresh_expiration_secs: 168 * 3600,
        }
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret_key.clone(),
            access_expiration_secs: config.access_token_ttl_hours.saturating_mul(3600),
            refresh_expiration_secs: config.refresh_token_ttl_hours.saturating_mul(3600),
        }
    }
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

fn sign(config: &JwtConfig, claims: &SignedDetails) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(JwtError::Encoding)
}

/// Generate both the access token and the refresh token for a user
///
/// # Arguments
///
/// * `config` - JWT configuration containing secret and lifetimes
/// * `email` - User's email address
/// * `first_name` - User's first name
/// * `last_name` - User's last name
/// * `uid` - Secondary user id
///
/// # Example
///
/// ```no_run
/// use daybook_api::auth::jwt::{generate_all_tokens, JwtConfig};
///
/// let config = JwtConfig::new("secret");
/// let pair = generate_all_tokens(&config, "a@x.com", "Ada", "Lovelace", "uid-1")
///     .expect("Failed to sign tokens");
/// println!("{}", pair.token);
/// ```
pub fn generate_all_tokens(
    config: &JwtConfig,
    email: &str,
    first_name: &str,
    last_name: &str,
    uid: &str,
) -> Result<TokenPair, JwtError> {
    let now = now_secs()?;

    let mut claims = SignedDetails {
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        uid: uid.to_string(),
        token_type: TokenType::Access,
        iat: now,
        exp: now.saturating_add(config.access_expiration_secs),
    };
    let token = sign(config, &claims)?;

    claims.token_type = TokenType::Refresh;
    claims.exp = now.saturating_add(config.refresh_expiration_secs);
    let refresh_token = sign(config, &claims)?;

    Ok(TokenPair {
        token,
        refresh_token,
    })
}

/// Validate a token of either kind and extract its claims
///
/// Expiry is checked explicitly after decoding, so a token is rejected as
/// soon as `exp` has passed regardless of the decoder's leeway.
pub fn validate_token(config: &JwtConfig, token: &str) -> Result<SignedDetails, JwtError> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<SignedDetails>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    let claims = token_data.claims;
    if claims.exp < now_secs()? {
        return Err(JwtError::Expired);
    }

    Ok(claims)
}

/// Validate a token and require it to be an access token
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<SignedDetails, JwtError> {
    expect_type(validate_token(config, token)?, TokenType::Access)
}

/// Validate a token and require it to be a refresh token
pub fn validate_refresh_token(config: &JwtConfig, token: &str) -> Result<SignedDetails, JwtError> {
    expect_type(validate_token(config, token)?, TokenType::Refresh)
}

fn expect_type(claims: SignedDetails, expected: TokenType) -> Result<SignedDetails, JwtError> {
    if claims.token_type != expected {
        return Err(JwtError::WrongTokenType { expected });
    }
    Ok(claims)
}
