//! Authentication and authorization module
//!
//! This module provides JWT-based authentication with the following components:
//! - Token generation and validation
//! - Password hashing with Argon2
//! - Middleware guarding protected routes
//! - Authentication service for signup, login, refresh and password changes
//! - Models and the repository layer for the user collection

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;

pub use jwt::{generate_all_tokens, validate_access_token, JwtConfig, SignedDetails, TokenPair};
pub use middleware::{auth_middleware, AuthError, AuthenticatedUser};
pub use models::{User, UserPublic};
pub use password::{hash_password, verify_password, PasswordConfig};
pub use repository::{RepositoryError, SurrealUserRepository, UserRepository};
pub use service::AuthService;

#[cfg(any(test, feature = "test-utils"))]
pub use repository::MemoryUserRepository;
