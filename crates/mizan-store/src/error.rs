//! # Store Error Types
//!
//! Errors from local document persistence.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Categorized: full vs unavailable           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError::Storage (mizan-sync) ← Surfaced as a hard failure,      │
//! │       │                                distinct from validation         │
//! │       ▼                                                                 │
//! │  Caller warns the user; in-memory state stays operative                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Local persistence errors.
///
/// A failed save means the write is NOT durable. The in-memory copy the
/// caller already holds remains the operative state for the session.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The device is out of space (SQLITE_FULL).
    #[error("Device storage is full")]
    StorageFull,

    /// The store cannot be reached or the query failed.
    ///
    /// Covers pool exhaustion, file permission problems and driver
    /// errors that are not a full disk.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The stored payload could not be (de)serialized.
    ///
    /// On load this means the document on disk is corrupt or from an
    /// incompatible build.
    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration failed on startup.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// "database or disk is full" → StoreError::StorageFull
/// PoolTimedOut / PoolClosed  → StoreError::Unavailable
/// Other                      → StoreError::Unavailable
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                // SQLITE_FULL surfaces as this message text
                if db_err.message().contains("database or disk is full") {
                    StoreError::StorageFull
                } else {
                    StoreError::Unavailable(db_err.message().to_string())
                }
            }
            sqlx::Error::PoolTimedOut => {
                StoreError::Unavailable("connection pool exhausted".to_string())
            }
            sqlx::Error::PoolClosed => StoreError::Unavailable("pool is closed".to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
