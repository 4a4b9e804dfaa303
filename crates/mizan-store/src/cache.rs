//! # State Document Cache
//!
//! The durable on-device copy of the aggregate State, and the single
//! source of truth for reads.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        State Document Cache                             │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreConfig::new(path) ← Configure pool settings                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StateCache::open(config).await ← Create pool + run migrations         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────────┐                      │
//! │  │  SqlitePool (WAL)                            │                      │
//! │  │  state_documents: doc_key → JSON payload     │                      │
//! │  └──────────────────────┬───────────────────────┘                      │
//! │                         │                                               │
//! │   load() ── SELECT payload ── deserialize ──► Option<State>            │
//! │                                                                         │
//! │   save() ── serialize ── UPSERT ── broadcast(Arc<State>)               │
//! │                                        │                                │
//! │                                        ▼                                │
//! │              every subscriber observes the committed State             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Change Notification
//! Every successful `save` publishes the new State on a broadcast channel.
//! Subscribers observe each committed change without polling; a slow
//! subscriber that lags simply skips to the newest document (intermediate
//! states are superseded, not required).

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::{debug, info};

use mizan_core::State;

use crate::error::{StoreError, StoreResult};
use crate::migrations;

/// Capacity of the change broadcast channel. Laggards skip to newest.
const CHANGE_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/path/to/mizan.db")
///     .document_key("shop-main");
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Key of the aggregate document this deployment reads and writes.
    /// Default: "mizan-state"
    pub document_key: String,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Whether to run migrations on open.
    /// Default: true
    pub run_migrations: bool,
}

impl StoreConfig {
    /// Creates a configuration for the given database path.
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            document_key: "mizan-state".to_string(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Sets the aggregate document key.
    pub fn document_key(mut self, key: impl Into<String>) -> Self {
        self.document_key = key.into();
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Creates an in-memory configuration (for testing).
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(":memory:"),
            document_key: "mizan-state".to_string(),
            max_connections: 1, // In-memory requires single connection
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// State Cache
// =============================================================================

/// The local persistent cache of the aggregate State document.
///
/// Cheap to clone; clones share the pool and the change channel.
#[derive(Debug, Clone)]
pub struct StateCache {
    pool: SqlitePool,
    document_key: String,
    changes: broadcast::Sender<Arc<State>>,
}

impl StateCache {
    /// Opens the cache.
    ///
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite (WAL, NORMAL synchronous, foreign keys)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            document_key = %config.document_key,
            "Opening state cache"
        );

        // sqlite://path?mode=rwc creates the file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            // WAL mode: readers don't block the writer
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL synchronous: safe from corruption, may lose the
            // last transaction on power loss
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        }

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        info!(max_connections = config.max_connections, "State cache ready");
        Ok(StateCache {
            pool,
            document_key: config.document_key,
            changes,
        })
    }

    /// Loads the stored State document, if any.
    ///
    /// `None` is the absence case (fresh install), not an error.
    pub async fn load(&self) -> StoreResult<Option<State>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM state_documents WHERE doc_key = ?1")
                .bind(&self.document_key)
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(json) => {
                let state: State = serde_json::from_str(&json)?;
                debug!(document_key = %self.document_key, "Loaded state document");
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Loads the stored State, or the empty State if nothing is stored yet.
    pub async fn load_or_default(&self) -> StoreResult<State> {
        Ok(self.load().await?.unwrap_or_default())
    }

    /// Persists the State document and notifies subscribers.
    ///
    /// The write is a whole-document upsert; on success every subscriber
    /// receives the committed State. On failure nothing is notified and
    /// the caller must treat the write as not durable.
    pub async fn save(&self, state: &State) -> StoreResult<()> {
        let payload = serde_json::to_string(state)?;

        sqlx::query(
            "INSERT INTO state_documents (doc_key, payload, saved_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(doc_key) DO UPDATE SET
                 payload = excluded.payload,
                 saved_at = excluded.saved_at",
        )
        .bind(&self.document_key)
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            document_key = %self.document_key,
            bytes = payload.len(),
            "Saved state document"
        );

        // No receivers is fine: nobody is watching yet.
        let _ = self.changes.send(Arc::new(state.clone()));
        Ok(())
    }

    /// Subscribes to committed State changes.
    ///
    /// The receiver yields every State published by `save` from the
    /// moment of subscription onward. For an "initial value plus
    /// changes" surface see [`crate::subscription::watch`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<State>> {
        self.changes.subscribe()
    }

    /// The document key this cache reads and writes.
    pub fn document_key(&self) -> &str {
        &self.document_key
    }

    /// Returns a reference to the connection pool, for diagnostics.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks that the store can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        info!("Closing state cache");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
