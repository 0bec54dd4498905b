//! Service configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use metabolic_guide_domain::auth::token::{SecurityError, TokenSettings};
use metabolic_guide_domain::database::{DatabaseConfig, DatabaseError};
use metabolic_guide_domain::repository::RemoteStoreConfig;
use metabolic_guide_domain::services::recommendations::{
    OpenAiConfig, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Token(#[from] SecurityError),
}

/// Which record store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageChoice {
    /// Remote store when configured, otherwise SQLite, otherwise memory
    Auto,
    Remote,
    Sqlite,
    Memory,
}

impl FromStr for StorageChoice {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(StorageChoice::Auto),
            "remote" | "supabase" => Ok(StorageChoice::Remote),
            "sqlite" => Ok(StorageChoice::Sqlite),
            "memory" => Ok(StorageChoice::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Everything `main` needs to build the application context
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub storage: StorageChoice,
    pub database: DatabaseConfig,
    /// Set when `SUPABASE_URL` and `SUPABASE_ANON_KEY` hold real values
    pub remote: Option<RemoteStoreConfig>,
    /// Set when `OPENAI_API_KEY` holds a real value
    pub openai: Option<OpenAiConfig>,
    pub tokens: TokenSettings,
    pub cors_allow_origin: Option<String>,
}

/// Unset, blank and template values (`YOUR_...`) all count as missing
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.to_ascii_uppercase().starts_with("YOUR_")
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        _ => Ok(default),
    }
}

impl AppConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_env()?;
        let tokens = TokenSettings::from_env()?;
        Self::from_lookup(|key| env::var(key).ok(), database, tokens)
    }

    /// Build from any key/value source
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        database: DatabaseConfig,
        tokens: TokenSettings,
    ) -> Result<Self, ConfigError> {
        let configured = |key: &str| lookup(key).filter(|value| !is_placeholder(value));

        let port = parse(&lookup, "PORT", DEFAULT_PORT)?;
        let timeout = Duration::from_secs(parse(
            &lookup,
            "HTTP_TIMEOUT_SECONDS",
            DEFAULT_HTTP_TIMEOUT_SECONDS,
        )?);

        let storage = match lookup("STORAGE_BACKEND") {
            Some(value) => value
                .parse::<StorageChoice>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "STORAGE_BACKEND",
                    value,
                })?,
            None => StorageChoice::Auto,
        };

        let remote = match (configured("SUPABASE_URL"), configured("SUPABASE_ANON_KEY")) {
            (Some(base_url), Some(api_key)) => Some(RemoteStoreConfig {
                base_url,
                api_key,
                timeout,
            }),
            (Some(_), None) | (None, Some(_)) => {
                warn!("Remote store needs both SUPABASE_URL and SUPABASE_ANON_KEY; ignoring it");
                None
            }
            (None, None) => None,
        };

        let openai = configured("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model: configured("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: configured("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            timeout,
        });

        let cors_allow_origin = configured("CORS_ALLOW_ORIGIN").filter(|origin| origin != "*");

        info!(
            "Configuration: port={}, storage={:?}, remote store={}, AI recommendations={}",
            port,
            storage,
            remote.is_some(),
            openai.is_some()
        );

        Ok(Self {
            port,
            storage,
            database,
            remote,
            openai,
            tokens,
            cors_allow_origin,
        })
    }
}
