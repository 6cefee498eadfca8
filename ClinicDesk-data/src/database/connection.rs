//! Database connection module for the ClinicDesk application
//!
//! All data lives in a single SQLite database reached through an `r2d2` pool.
//! The server initialises one global pool at startup; tests build their own
//! private in-memory pools with [`DatabasePool::in_memory`].

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::migrations::run_migrations;

/// Global database pool used by the server process
static DB_POOL: OnceCell<DatabasePool> = OnceCell::new();

/// A connection checked out of the pool
pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Database error
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// SQLite connection pool error
    #[error("SQLite connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    /// Database pool already initialized
    #[error("Database pool is already initialized")]
    PoolAlreadyInitialized,

    /// Database pool not initialized
    #[error("Database pool is not initialized")]
    PoolNotInitialized,

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),

    /// The directory holding the database file could not be prepared
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub sqlite_path: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection checkout timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "./data/clinic_desk.db".to_string(),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let sqlite_path = env::var("DB_SQLITE_PATH").unwrap_or_else(|_| {
            info!("No DB_SQLITE_PATH provided, using default path: {}", defaults.sqlite_path);
            defaults.sqlite_path.clone()
        });

        let max_connections = env_or_default("DB_MAX_CONNECTIONS", defaults.max_connections);
        let timeout_seconds = env_or_default("DB_TIMEOUT_SECONDS", defaults.timeout_seconds);

        info!(
            "Database configuration: path={}, max_connections={}, timeout={}s",
            sqlite_path, max_connections, timeout_seconds
        );

        Self {
            sqlite_path,
            max_connections,
            timeout_seconds,
        }
    }
}

fn env_or_default<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

/// Per-connection setup applied by the pool
fn configure_connection(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))
}

/// Pooled SQLite connections plus the location they point at
#[derive(Debug, Clone)]
pub struct DatabasePool {
    inner: Arc<r2d2::Pool<SqliteConnectionManager>>,
    location: String,
}

impl DatabasePool {
    /// Open (creating if needed) the database file described by `config` and migrate it
    pub fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        info!("Initializing SQLite database at: {}", config.sqlite_path);

        if let Some(parent) = Path::new(&config.sqlite_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating parent directory: {:?}", parent);
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(&config.sqlite_path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
            .with_init(configure_connection);

        let pool = r2d2::Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.timeout_seconds))
            .build(manager)
            .map_err(|e| {
                error!("Failed to create SQLite connection pool: {}", e);
                DatabaseError::PoolError(e)
            })?;

        let pool = Self {
            inner: Arc::new(pool),
            location: config.sqlite_path.clone(),
        };
        pool.migrate()?;

        info!("SQLite connection pool created successfully");
        Ok(pool)
    }

    /// Build a migrated in-memory database.
    ///
    /// SQLite gives every in-memory connection its own database, so the pool
    /// holds exactly one connection and never recycles it.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let manager = SqliteConnectionManager::memory().with_init(configure_connection);

        let pool = r2d2::Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        let pool = Self {
            inner: Arc::new(pool),
            location: ":memory:".to_string(),
        };
        pool.migrate()?;

        debug!("In-memory SQLite database initialized");
        Ok(pool)
    }

    /// Check out a connection
    pub fn get(&self) -> Result<SqliteConnection, DatabaseError> {
        Ok(self.inner.get()?)
    }

    /// Path of the database file (or `:memory:`)
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Describe the connection for health reporting, verifying it with a trivial query
    pub fn connection_info(&self) -> Result<String, DatabaseError> {
        let conn = self.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;

        let state = self.inner.state();
        Ok(format!(
            "SQLite database at {} (connections: active={}, idle={})",
            self.location, state.connections, state.idle_connections
        ))
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        let conn = self.get()?;
        run_migrations(&conn)
    }
}

/// Initialize the global database connection pool from the environment
pub fn initialize_database_pool() -> Result<DatabasePool, DatabaseError> {
    if DB_POOL.get().is_some() {
        return Err(DatabaseError::PoolAlreadyInitialized);
    }

    let config = DatabaseConfig::from_env();
    let pool = DatabasePool::open(&config)?;

    DB_POOL
        .set(pool.clone())
        .map_err(|_| DatabaseError::PoolAlreadyInitialized)?;

    Ok(pool)
}

/// Get the global database connection pool
pub fn get_db_pool() -> Result<DatabasePool, DatabaseError> {
    DB_POOL.get().cloned().ok_or(DatabaseError::PoolNotInitialized)
}
