//! # Cache Pool Management
//!
//! Connection pool creation and configuration for the SQLite offline cache.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cache Connection Pool                              │
//! │                                                                         │
//! │  PlayerAgent start()                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CacheConfig::new(path) ← Configure pool settings                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CacheStore::new(config).await ← Create pool + run migrations          │
//! │       │   (the agent memoizes this behind a OnceCell so concurrent     │
//! │       │    initializers converge on ONE handle)                        │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐                │  (max_connections)        │
//! │  │  │Conn1│ │Conn2│ │Conn3│ ...            │                           │
//! │  │  └─────┘ └─────┘ └─────┘                │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ Concurrent access: fetch persists while a command reads        │
//! │       ▼                                                                 │
//! │  put / get / clear on the offline_cache table                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Better crash recovery — the last-known-good snapshot must survive a
//!   power cut, that is the whole point of this cache

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CacheError, CacheResult};
use crate::migrations;
use crate::repository::cache::CacheRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Offline cache configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = CacheConfig::new("/path/to/cache.db")
///     .max_connections(3);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Path to the SQLite cache file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 3 (a single player process needs very few)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl CacheConfig {
    /// Creates a new cache configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite cache file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CacheConfig {
            database_path: path.into(),
            max_connections: 3,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Creates an in-memory cache configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let config = CacheConfig::in_memory();
    /// let store = CacheStore::new(config).await?;
    /// // Cache is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        CacheConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Cache Store
// =============================================================================

/// Main cache handle providing repository access.
///
/// Cheap to clone (wraps a pooled connection). The player agent opens the
/// store once during `start()` and shares the clone everywhere; opening is
/// memoized there so concurrent initializers converge on the same handle.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl CacheStore {
    /// Creates a new cache store.
    ///
    /// ## What This Does
    /// 1. Creates the cache file if it doesn't exist
    /// 2. Configures SQLite for unattended-display durability:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(CacheStore)` - Ready-to-use cache handle
    /// * `Err(CacheError)` - Connection or migration failed
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening offline content cache"
        );

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?
            // WAL mode: readers don't block writers, better crash recovery
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL synchronous: safe from corruption, may lose the very
            // last write on a power cut - acceptable, the next fetch rewrites it
            .synchronous(SqliteSynchronous::Normal)
            // Create file if it doesn't exist
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Cache pool created"
        );

        let store = CacheStore { pool };

        if config.run_migrations {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    /// Runs cache migrations.
    ///
    /// Idempotent: safe to run multiple times. Automatically called by
    /// `new()` unless disabled in the config.
    pub async fn run_migrations(&self) -> CacheResult<()> {
        info!("Running cache migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For diagnostics not covered by the repository. Prefer [`Self::cache`].
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the cache repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let cached = store.cache().get("content-dev-1").await?;
    /// ```
    pub fn cache(&self) -> CacheRepository {
        CacheRepository::new(self.pool.clone())
    }

    /// Closes the cache connection pool.
    ///
    /// Call on player shutdown. After closing, repository operations fail.
    pub async fn close(&self) {
        info!("Closing cache connection pool");
        self.pool.close().await;
    }

    /// Checks if the cache is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_cache() {
        let config = CacheConfig::in_memory();
        let store = CacheStore::new(config).await.unwrap();

        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = CacheConfig::new("/tmp/test-cache.db")
            .max_connections(5)
            .connect_timeout(Duration::from_secs(10));

        assert_eq!(config.max_connections, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }
}
