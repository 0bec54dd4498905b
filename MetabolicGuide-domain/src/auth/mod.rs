//! Authentication for MetabolicGuide
//!
//! Users sign in with an email (and a password when a remote store is
//! configured) and receive a signed bearer token. The server keeps no
//! session state: each request carries its own identity.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use metabolic_guide_data::repository::{RemoteStore, RepositoryError};

pub mod logging;
pub mod token;

#[cfg(feature = "with-axum")]
pub mod routes;

#[cfg(feature = "with-axum")]
pub use routes::{auth_middleware, auth_routes, AuthState};

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Remote store access token of the signed-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

/// The authenticated user of a request
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CurrentUser {
    pub email: String,
    /// Remote store access token; writes to the remote store are made with it
    #[serde(skip)]
    pub session_token: Option<String>,
}

impl CurrentUser {
    /// A user without a remote store session
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            session_token: None,
        }
    }
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("email", &self.email)
            .field("has_session", &self.session_token.is_some())
            .finish()
    }
}

impl From<&Claims> for CurrentUser {
    fn from(claims: &Claims) -> Self {
        Self {
            email: claims.sub.clone(),
            session_token: claims.session.clone(),
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LoginRequest {
    pub email: String,
    /// Required when signing in against the remote store
    #[serde(default)]
    pub password: Option<String>,
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LoginResponse {
    /// JWT access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: CurrentUser,
    /// "demo" or "remote"
    pub mode: String,
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email is required")]
    MissingEmail,

    #[error("Password is required")]
    MissingPassword,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Authentication backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Token(#[from] token::SecurityError),
}

/// Verifies login credentials
#[async_trait]
pub trait AuthServiceTrait: Send + Sync {
    async fn authenticate(&self, request: &LoginRequest) -> Result<CurrentUser, AuthError>;

    /// Short name of the sign-in mode
    fn mode(&self) -> &'static str;
}

fn required_email(request: &LoginRequest) -> Result<String, AuthError> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(AuthError::MissingEmail);
    }
    Ok(email.to_string())
}

/// Accepts any non-empty email. Used when no remote store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoAuthService;

#[async_trait]
impl AuthServiceTrait for DemoAuthService {
    async fn authenticate(&self, request: &LoginRequest) -> Result<CurrentUser, AuthError> {
        Ok(CurrentUser::new(required_email(request)?))
    }

    fn mode(&self) -> &'static str {
        "demo"
    }
}

/// Password sign-in against the remote store
#[derive(Debug, Clone)]
pub struct RemoteAuthService {
    store: RemoteStore,
}

impl RemoteAuthService {
    pub fn new(store: RemoteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthServiceTrait for RemoteAuthService {
    async fn authenticate(&self, request: &LoginRequest) -> Result<CurrentUser, AuthError> {
        let email = required_email(request)?;
        let password = request
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingPassword)?;

        match self.store.sign_in(&email, password).await {
            Ok(session) => Ok(CurrentUser {
                email: session.email,
                session_token: Some(session.access_token),
            }),
            Err(RepositoryError::Unauthorized(message)) => Err(AuthError::InvalidCredentials(message)),
            Err(e) => Err(AuthError::Backend(e.to_string())),
        }
    }

    fn mode(&self) -> &'static str {
        "remote"
    }
}
