use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventType {
    /// User login
    Login,
    /// User logout
    Logout,
    /// Failed login attempt
    FailedLogin,
    /// Bearer token check
    TokenValidation,
    /// Anonymous caller hit a route that needs a user
    AccessDenied,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::Login => write!(f, "LOGIN"),
            AuthEventType::Logout => write!(f, "LOGOUT"),
            AuthEventType::FailedLogin => write!(f, "FAILED_LOGIN"),
            AuthEventType::TokenValidation => write!(f, "TOKEN_VALIDATION"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    /// User email, when known
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
    /// Request path, when the event came from a request
    pub resource: Option<String>,
    /// Duration of the operation in milliseconds
    pub duration_ms: Option<u64>,
    /// "demo", "remote" or "jwt"
    pub auth_method: Option<String>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            duration_ms: None,
            auth_method: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }
}

/// Log an authentication event
pub fn log_auth_event(event: AuthEvent) {
    let user_id = event.user_id.as_deref().unwrap_or("anonymous");
    let details = event.details.as_deref().unwrap_or("");
    let resource = event.resource.as_deref().unwrap_or("-");
    let method = event.auth_method.as_deref().unwrap_or("-");

    if event.success {
        info!(
            event_type = %event.event_type,
            user = user_id,
            method,
            resource,
            duration_ms = event.duration_ms,
            "AUTH-LOG [{}] [{}] [SUCCESS] {}",
            event.event_type,
            user_id,
            details
        );
    } else {
        warn!(
            event_type = %event.event_type,
            user = user_id,
            method,
            resource,
            duration_ms = event.duration_ms,
            "AUTH-LOG [{}] [{}] [FAILURE] {}",
            event.event_type,
            user_id,
            details
        );
    }
}

/// Log a successful login
pub fn log_successful_login(email: &str, auth_method: &str) {
    log_auth_event(
        AuthEvent::new(AuthEventType::Login, Some(email), true).with_auth_method(auth_method),
    );
}

/// Log a failed login attempt
pub fn log_failed_login(email: &str, auth_method: &str, reason: &str) {
    log_auth_event(
        AuthEvent::new(AuthEventType::FailedLogin, Some(email), false)
            .with_details(reason)
            .with_auth_method(auth_method),
    );
}

/// Log a logout event
pub fn log_logout(email: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Logout, Some(email), true));
}

/// Log a rejected anonymous request
pub fn log_access_denied(resource: &str, reason: &str) {
    log_auth_event(
        AuthEvent::new(AuthEventType::AccessDenied, None, false)
            .with_resource(resource)
            .with_details(reason),
    );
}
