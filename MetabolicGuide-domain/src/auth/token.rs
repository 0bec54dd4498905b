use std::env;
use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{Claims, CurrentUser};

pub const DEFAULT_ISSUER: &str = "metabolic-guide-api";
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 60;
/// One year
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 525_600;

/// Security errors for token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// JWT validation error
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// Unusable token settings
    #[error("Invalid token configuration: {0}")]
    InvalidConfiguration(String),
}

/// Signing settings for access tokens
#[derive(Clone)]
pub struct TokenSettings {
    secret: String,
    issuer: String,
    access_ttl: Duration,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("issuer", &self.issuer)
            .field("access_ttl_minutes", &self.access_ttl.num_minutes())
            .finish_non_exhaustive()
    }
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, access_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            access_ttl,
        }
    }

    /// Read `JWT_SECRET`, `JWT_ISSUER` and `ACCESS_TOKEN_EXPIRATION_MINUTES`.
    ///
    /// Without a secret a random one is generated, so tokens stop working
    /// when the process restarts.
    pub fn from_env() -> Result<Self, SecurityError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SecurityError> {
        let secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.trim().is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, generating an ephemeral signing secret");
                format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
            }
        };

        let issuer = lookup("JWT_ISSUER")
            .filter(|issuer| !issuer.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());

        let expiration_minutes = match lookup("ACCESS_TOKEN_EXPIRATION_MINUTES") {
            Some(value) if !value.trim().is_empty() => value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|minutes| (1..=MAX_ACCESS_TOKEN_MINUTES).contains(minutes))
                .ok_or_else(|| {
                    SecurityError::InvalidConfiguration(format!(
                        "ACCESS_TOKEN_EXPIRATION_MINUTES must be between 1 and {}, got '{}'",
                        MAX_ACCESS_TOKEN_MINUTES, value
                    ))
                })?,
            _ => DEFAULT_ACCESS_TOKEN_MINUTES,
        };

        Ok(Self::new(secret, issuer, Duration::minutes(expiration_minutes)))
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Access token lifetime in seconds
    pub fn expires_in(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}

/// Generate a signed access token for a user, carrying their remote
/// store session when they have one
pub fn generate_token(settings: &TokenSettings, user: &CurrentUser) -> Result<String, SecurityError> {
    let now = Utc::now();
    let expiration = now + settings.access_ttl;

    let claims = Claims {
        sub: user.email.clone(),
        iss: settings.issuer.clone(),
        iat: now.timestamp(),
        exp: expiration.timestamp(),
        session: user.session_token.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Failed to encode JWT token: {}", e);
        SecurityError::TokenValidation(e.to_string())
    })?;

    // Log token generation (but not the token itself)
    info!("Generated access token for user {}", user.email);
    debug!("Token expiration: {}", expiration);

    Ok(token)
}

/// Validate a token and return the decoded claims
pub fn validate_token(settings: &TokenSettings, token: &str) -> Result<Claims, SecurityError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.set_issuer(&[settings.issuer.as_str()]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => SecurityError::InvalidIssuer,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => {
            SecurityError::TokenValidation("Invalid signature".to_string())
        }
        _ => SecurityError::TokenValidation(e.to_string()),
    })?;

    Ok(token_data.claims)
}
