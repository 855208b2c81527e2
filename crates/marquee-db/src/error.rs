//! # Cache Error Types
//!
//! Error types for offline-cache operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CacheError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  marquee-player logs it and treats it as a cache miss / no-op          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  The display keeps rendering; a broken cache never crashes the player  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Offline-cache operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging. A missing key is NOT an error: `get` returns `None`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Cache file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Invalid SQL in migration
    /// - Migration version conflict
    /// - Schema incompatibility
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Cached payload could not be (de)serialized.
    ///
    /// ## When This Occurs
    /// - A row written by a different player version
    /// - Manual edits to the cache database
    #[error("Serialization failed for key '{key}': {message}")]
    Serialization { key: String, message: String },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal cache error.
    #[error("Internal cache error: {0}")]
    Internal(String),
}

/// Convert sqlx errors to CacheError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::PoolTimedOut   → CacheError::PoolExhausted
/// sqlx::Error::PoolClosed     → CacheError::ConnectionFailed
/// sqlx::Error::Database       → CacheError::QueryFailed
/// Other                       → CacheError::Internal
/// ```
impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => CacheError::PoolExhausted,

            sqlx::Error::PoolClosed => {
                CacheError::ConnectionFailed("Pool is closed".to_string())
            }

            sqlx::Error::Database(db_err) => CacheError::QueryFailed(db_err.message().to_string()),

            _ => CacheError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for CacheError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CacheError::MigrationFailed(err.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
