//! Security audit logging for authentication events
//!
//! Provides structured audit logging for signups, logins, token refreshes,
//! password changes and rejected tokens.
//!
//! All audit events are logged at INFO level with the "audit" target,
//! making them easy to filter and route to security monitoring systems.
//!
//! # Example
//!
//! ```ignore
//! use daybook_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.user_id.clone(),
//!     email: user.email.clone(),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: None,
//! });
//! ```

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// New account created
    SignupSuccess {
        user_id: String,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Signup rejected (validation, duplicate, storage failure)
    SignupFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful user login
    LoginSuccess {
        user_id: String,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Token pair rotated through the refresh endpoint
    TokenRefresh {
        user_id: String,
        ip_address: Option<String>,
    },

    /// Password change
    PasswordChange {
        user_id: String,
        success: bool,
        reason: Option<String>,
        ip_address: Option<String>,
    },

    /// Invalid or expired token presented to the auth gate
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },
}

impl AuditEvent {
    /// Human readable summary used as the log message
    fn summary(&self) -> &'static str {
        match self {
            Self::SignupSuccess { .. } => "User signed up",
            Self::SignupFailure { .. } => "Signup rejected",
            Self::LoginSuccess { .. } => "Login successful",
            Self::LoginFailure { .. } => "Login failed",
            Self::TokenRefresh { .. } => "Tokens refreshed",
            Self::PasswordChange { .. } => "Password change",
            Self::InvalidToken { .. } => "Invalid token rejected",
        }
    }
}

/// Log a security audit event with structured fields
///
/// The event is serialized to JSON so log aggregators receive the full
/// record, for example:
///
/// ```json
/// {
///   "event_type": "login_success",
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "email": "user@example.com",
///   "ip_address": "192.168.1.1",
///   "user_agent": null
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::SignupSuccess {
            user_id,
            email,
            ip_address,
            ..
        }
        | AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::SignupFailure {
            email,
            reason,
            ip_address,
            ..
        }
        | AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::TokenRefresh {
            user_id,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::PasswordChange {
            user_id,
            success,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                success = %success,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::InvalidToken {
            ip_address, reason, ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                reason = %reason,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
    }
}

/// Extract the client IP address from proxy headers
///
/// Checks `X-Forwarded-For` (first hop) and then `X-Real-IP`.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|xff| xff.to_str().ok())
        .and_then(|xff| xff.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: "uid-1".to_string(),
            email: "a@x.com".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("a@x.com"));
    }

    #[test]
    fn test_audit_log_all_events() {
        // Only checks that logging never panics
        audit_log(&AuditEvent::SignupSuccess {
            user_id: "uid-1".to_string(),
            email: "a@x.com".to_string(),
            ip_address: None,
            user_agent: None,
        });
        audit_log(&AuditEvent::SignupFailure {
            email: "a@x.com".to_string(),
            reason: "This email already exists".to_string(),
            ip_address: None,
            user_agent: None,
        });
        audit_log(&AuditEvent::LoginFailure {
            email: "a@x.com".to_string(),
            reason: "login or password is incorrect".to_string(),
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: None,
        });
        audit_log(&AuditEvent::TokenRefresh {
            user_id: "uid-1".to_string(),
            ip_address: None,
        });
        audit_log(&AuditEvent::PasswordChange {
            user_id: "uid-1".to_string(),
            success: false,
            reason: Some("current password is incorrect".to_string()),
            ip_address: None,
        });
        audit_log(&AuditEvent::InvalidToken {
            ip_address: None,
            user_agent: None,
            reason: "token is expired".to_string(),
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(extract_ip_address(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(extract_ip_address(&headers).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = HeaderMap::new();
        assert!(extract_ip_address(&headers).is_none());
        assert!(extract_user_agent(&headers).is_none());
    }
}
