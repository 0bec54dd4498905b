//! Database connection module for the MetabolicGuide application
//!
//! Provides the pooled SQLite connection used as the local record store.
//! The pool is created once at startup and handed to the repositories
//! that need it; there is no process-wide pool.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;
use tracing::{error, info, warn};

use super::migrations::run_sqlite_migrations;

/// Path value that selects a private in-memory database
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Database error
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// SQLite connection pool error
    #[error("SQLite connection pool error: {0}")]
    SqlitePoolError(#[from] r2d2::Error),

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    ConfigError(String),
}

/// Database configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`
    pub sqlite_path: String,
    /// Maximum number of pooled connections
    pub pool_size: u32,
    /// Connection timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/metabolic_guide.db".to_string(),
            pool_size: 5,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a throwaway in-memory database
    pub fn in_memory() -> Self {
        Self {
            sqlite_path: IN_MEMORY_PATH.to_string(),
            ..Self::default()
        }
    }

    /// Create a new database configuration from environment variables.
    ///
    /// `DB_SQLITE_PATH` wins over `DATA_DIR`; with neither set the database
    /// lives at `data/metabolic_guide.db`.
    pub fn from_env() -> Result<Self, DatabaseError> {
        let sqlite_path = match env::var("DB_SQLITE_PATH") {
            Ok(path) if !path.trim().is_empty() => path,
            _ => {
                let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
                Path::new(&data_dir)
                    .join("metabolic_guide.db")
                    .to_string_lossy()
                    .into_owned()
            }
        };

        let pool_size = parse_env("DB_POOL_SIZE", 5u32)?;
        if pool_size == 0 {
            return Err(DatabaseError::ConfigError(
                "DB_POOL_SIZE must be greater than zero".to_string(),
            ));
        }
        let timeout_seconds = parse_env("DB_TIMEOUT_SECONDS", 30u64)?;

        info!(
            "Database configuration: path={}, pool_size={}, timeout={}s",
            sqlite_path, pool_size, timeout_seconds
        );

        Ok(DatabaseConfig {
            sqlite_path,
            pool_size,
            timeout_seconds,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, DatabaseError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| DatabaseError::ConfigError(format!("{} has invalid value '{}'", key, value))),
        Err(_) => Ok(default),
    }
}

/// Pooled SQLite connections plus a description of where they point
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: Arc<r2d2::Pool<SqliteConnectionManager>>,
    location: String,
}

impl DatabasePool {
    /// Check out a connection
    pub fn get(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, r2d2::Error> {
        self.pool.get()
    }

    /// Whether the pool fell back to (or was configured for) an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.location == IN_MEMORY_PATH
    }

    /// Human-readable connection summary for health reporting
    pub fn connection_info(&self) -> String {
        let state = self.pool.state();
        let target = if self.is_in_memory() {
            "SQLite in-memory database".to_string()
        } else {
            format!("SQLite database at {}", self.location)
        };
        format!(
            "{} (connections: active={}, idle={})",
            target, state.connections, state.idle_connections
        )
    }
}

/// Initialize the database connection pool and run migrations.
///
/// When the file cannot be opened the pool falls back to an in-memory
/// SQLite database so the local store stays usable for the session.
pub fn initialize_database_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    let pool = if config.sqlite_path == IN_MEMORY_PATH {
        initialize_in_memory_sqlite_pool(config)?
    } else {
        initialize_sqlite_pool(config)?
    };

    info!("Running database migrations");
    let conn = pool.get()?;
    run_sqlite_migrations(&conn).map_err(DatabaseError::MigrationError)?;
    info!("Database migrations completed successfully");

    Ok(pool)
}

/// Initialize SQLite connection pool
fn initialize_sqlite_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    let sqlite_path = &config.sqlite_path;
    info!("Initializing SQLite database at: {}", sqlite_path);

    if let Some(parent) = Path::new(sqlite_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating parent directory: {:?}", parent);
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create directory: {}, falling back to in-memory database", e);
                return initialize_in_memory_sqlite_pool(config);
            }
        }
    }

    let manager = SqliteConnectionManager::file(sqlite_path)
        .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE);

    match r2d2::Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_secs(config.timeout_seconds))
        .build(manager)
    {
        Ok(pool) => match pool.get() {
            Ok(_) => {
                info!("SQLite connection pool created successfully");
                Ok(DatabasePool {
                    pool: Arc::new(pool),
                    location: sqlite_path.clone(),
                })
            }
            Err(e) => {
                error!("Failed to connect to SQLite database: {}", e);
                warn!("Falling back to in-memory SQLite database");
                initialize_in_memory_sqlite_pool(config)
            }
        },
        Err(e) => {
            error!("Failed to create SQLite connection pool: {}", e);
            warn!("Falling back to in-memory SQLite database");
            initialize_in_memory_sqlite_pool(config)
        }
    }
}

/// Initialize an in-memory SQLite database.
/// Every in-memory connection is its own database, so the pool holds one.
fn initialize_in_memory_sqlite_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!("Initializing in-memory SQLite database");

    let manager = SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder()
        .max_size(1)
        .connection_timeout(Duration::from_secs(config.timeout_seconds))
        .build(manager)?;

    Ok(DatabasePool {
        pool: Arc::new(pool),
        location: IN_MEMORY_PATH.to_string(),
    })
}
