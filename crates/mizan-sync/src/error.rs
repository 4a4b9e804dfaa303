//! # Sync Error Types
//!
//! Error types for replication and the Ledger service.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  SerializationFailed    │ │
//! │  │  InvalidUrl     │  │  Disconnected   │  │  DeserializationFailed  │ │
//! │  │  ConfigLoad/Save│  │  Timeout        │  │  RemoteRejected         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  SyncError is NEVER surfaced synchronously to Ledger callers: a        │
//! │  failed remote push is logged and the local commit stands. Callers     │
//! │  only ever see ServiceError (validation or storage).                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use mizan_core::LedgerError;
use mizan_store::StoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Replication error type.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid remote URL.
    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Failed to establish WebSocket connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket disconnected unexpectedly.
    #[error("Disconnected from remote replica")]
    Disconnected,

    /// Request timed out.
    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to serialize a message.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// The remote replied with an error message.
    #[error("Remote rejected request ({code}): {message}")]
    RemoteRejected { code: String, message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Replica is shutting down.
    #[error("Replica is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed => SyncError::Disconnected,
            WsError::AlreadyClosed => SyncError::Disconnected,
            WsError::Protocol(p) => SyncError::WebSocketError(p.to_string()),
            WsError::Io(io) => SyncError::ConnectionFailed(io.to_string()),
            other => SyncError::WebSocketError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Service Error
// =============================================================================

/// What callers of the Ledger service see.
///
/// Three categories, surfaced differently:
/// - `Ledger`: the operation aborted cleanly, nothing changed, tell the
///   user which input was wrong.
/// - `Storage`: the operation computed but the local save failed; the
///   result is NOT durable. The in-memory state stays operative for the
///   session, but the caller must warn the user distinctly.
/// - `Sync`: setup-time only (bad remote configuration). Steady-state
///   replication failure is deliberately absent here: it is logged and
///   never fails a commit.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result type alias for Ledger service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_flows_through_service_error() {
        let err: ServiceError = LedgerError::validation_required("items").into();
        assert!(matches!(err, ServiceError::Ledger(_)));
        assert_eq!(err.to_string(), "Validation error: items is required");
    }

    #[test]
    fn test_storage_errors_keep_their_message() {
        let err: ServiceError = StoreError::StorageFull.into();
        assert_eq!(err.to_string(), "Device storage is full");
    }

    #[test]
    fn test_remote_rejection_formats_code() {
        let err = SyncError::RemoteRejected {
            code: "NOT_AUTHORIZED".to_string(),
            message: "bad token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Remote rejected request (NOT_AUTHORIZED): bad token"
        );
    }
}
