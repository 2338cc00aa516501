//! Application state management

use crate::auth::{AuthService, JwtConfig, PasswordConfig, UserRepository};
use daybook_core::config::AppConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Signup, login and token lifecycle
    pub auth: AuthService,
}

impl AppState {
    /// Build the state from configuration and a user store
    pub fn new(config: AppConfig, users: Arc<dyn UserRepository>) -> Self {
        let auth = AuthService::new(
            users,
            JwtConfig::from(&config.auth),
            PasswordConfig::from(&config.auth),
        );

        Self {
            config,
            start_time: Instant::now(),
            is_ready: AtomicBool::new(true),
            auth,
        }
    }

    /// State backed by an in-memory user store and cheap hashing parameters
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        let mut config = AppConfig::default();
        config.auth.secret_key = "test-secret".to_string();
        config.auth.password_memory_kib = 1024;
        config.auth.password_time_cost = 1;
        config.auth.password_parallelism = 1;

        Self::new(
            config,
            Arc::new(crate::auth::MemoryUserRepository::new()),
        )
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
