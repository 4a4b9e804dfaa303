//! # mizan-sync: Replication and Service Layer for Mizan
//!
//! This crate turns the pure ledger operations of `mizan-core` and the
//! local persistence of `mizan-store` into a running service: serialized
//! commits, optional cloud replication over WebSocket, and configuration
//! for both.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Service Architecture                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Ledger (service facade)                      │  │
//! │  │                                                                   │  │
//! │  │  One method per business operation. An async mutex serializes    │  │
//! │  │  every read-modify-write cycle so overlapping calls compose.     │  │
//! │  └────────────────────────────┬──────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     SyncCoordinator                               │  │
//! │  │                                                                   │  │
//! │  │  Cold start (local > remote > empty), synchronous local save,    │  │
//! │  │  fire-and-forget remote push, watch task adopting remote         │  │
//! │  │  documents that differ from the current one                      │  │
//! │  └──────────┬──────────────────────────────────┬────────────────────┘  │
//! │             ▼                                  ▼                        │
//! │  ┌────────────────────┐          ┌─────────────────────────────────┐   │
//! │  │ StateCache         │          │ RemoteReplica (trait)           │   │
//! │  │ (mizan-store)      │          │                                 │   │
//! │  │                    │          │  WsReplica: WebSocket client    │   │
//! │  │ SQLite document    │          │  with auto-reconnect, backoff,  │   │
//! │  │ + change broadcast │          │  request correlation, watch     │   │
//! │  └────────────────────┘          │  re-subscription on reconnect   │   │
//! │                                  │                                 │   │
//! │                                  │  MemoryReplica: in-process      │   │
//! │                                  │  fake for tests                 │   │
//! │                                  └─────────────────────────────────┘   │
//! │                                                                         │
//! │  The device works fully offline. Replication is last-writer-wins on    │
//! │  the whole document; a dropped remote never blocks a commit.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`ledger`] - The `Ledger` service facade
//! - [`coordinator`] - Local/remote reconciliation
//! - [`remote`] - The `RemoteReplica` trait and in-memory fake
//! - [`transport`] - WebSocket replica with reconnection
//! - [`protocol`] - Wire messages for the replica protocol
//! - [`config`] - Device and remote configuration
//! - [`error`] - Sync and service error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mizan_store::{StateCache, StoreConfig};
//! use mizan_sync::{Ledger, SyncConfig};
//!
//! let config = SyncConfig::load_or_default(None);
//! let cache = StateCache::open(StoreConfig::new("mizan.db")).await?;
//! let ledger = Ledger::open(&config, cache).await?;
//!
//! let sale = ledger.process_sale(input).await?;
//! println!("Invoice #{}", sale.invoice_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod protocol;
pub mod remote;
pub mod transport;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{DeviceSettings, RemoteSettings, SyncConfig};
pub use coordinator::SyncCoordinator;
pub use error::{ServiceError, ServiceResult, SyncError, SyncResult};
pub use ledger::Ledger;
pub use protocol::{ReplicaMessage, PROTOCOL_VERSION};
pub use remote::{MemoryReplica, RemoteReplica};
pub use transport::{ConnectionState, TransportConfig, WsReplica};
