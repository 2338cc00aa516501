//! Password hashing and verification using Argon2id
//!
//! - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
//! - Memory / iterations / parallelism from [`PasswordConfig`]
//! - Salt: 16 bytes random
//! - Output: 32 bytes hash

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use daybook_core::AuthConfig;
use thiserror::Error;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 8;
/// Longest accepted password
pub const MAX_PASSWORD_LEN: usize = 128;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Password hashing configuration
///
/// Increasing memory or iterations improves resistance to brute force but
/// slows down every signup, login and password change.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl From<&AuthConfig> for PasswordConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            memory_cost: config.password_memory_kib,
            time_cost: config.password_time_cost,
            parallelism: config.password_parallelism,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Create Argon2 parameters from this configuration
    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash a plaintext password using Argon2id
///
/// Returns a PHC string (algorithm, parameters, salt and hash), safe to
/// store as-is. A bad parameter set is reported as an error.
///
/// # Example
///
/// ```no_run
/// use daybook_api::auth::password::{hash_password, PasswordConfig};
///
/// let hash = hash_password("SecureP@ssw0rd!", &PasswordConfig::default())
///     .expect("Failed to hash password");
/// // $argon2id$v=19$m=65536,t=3,p=4$...
/// println!("Hash: {}", hash);
/// ```
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = config.to_params()?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// The parameters are read back from the PHC string, so hashes produced
/// under an older [`PasswordConfig`] keep verifying.
///
/// # Returns
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError)` - The stored hash is malformed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Validate password length
///
/// Used as a `validator` custom function on request bodies.
pub fn validate_password_strength(password: &str) -> Result<(), validator::ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        let mut err = validator::ValidationError::new("password_too_short");
        err.message = Some(
            format!("password must be at least {MIN_PASSWORD_LEN} characters long").into(),
        );
        return Err(err);
    }
    if len > MAX_PASSWORD_LEN {
        let mut err = validator::ValidationError::new("password_too_long");
        err.message =
            Some(format!("password must be at most {MAX_PASSWORD_LEN} characters long").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn light_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let password = "SecureP@ssw0rd!";
        let hash = hash_password(password, &PasswordConfig::default())
            .expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash).expect("Verification failed"));
        assert!(!verify_password("WrongPassword", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        // Due to random salt, same password should produce different hashes
        let password = "SamePassword123!";
        let config = light_config();

        let hash1 = hash_password(password, &config).unwrap();
        let hash2 = hash_password(password, &config).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_invalid_params_are_an_error() {
        let config = PasswordConfig {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 0,
            output_len: Some(32),
        };
        let result = hash_password("password123", &config);
        assert!(matches!(result, Err(PasswordError::HashingFailed(_))));
    }

    #[test]
    fn test_custom_config() {
        let config = PasswordConfig {
            memory_cost: 32768,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        };

        let password = "TestPassword123!";
        let hash = hash_password(password, &config).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(hash.contains("m=32768"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=2"));
    }

    #[test]
    fn test_password_length_validation() {
        assert!(validate_password_strength("12345678").is_ok());
        assert!(validate_password_strength("short").is_err());
        assert!(validate_password_strength(&"x".repeat(MAX_PASSWORD_LEN + 1)).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_hash_verifies_only_its_own_password(
            password in "[ -~]{8,32}",
            other in "[ -~]{8,32}",
        ) {
            let hash = hash_password(&password, &light_config()).unwrap();
            prop_assert!(verify_password(&password, &hash).unwrap());
            if other != password {
                prop_assert!(!verify_password(&other, &hash).unwrap());
            }
        }
    }
}
