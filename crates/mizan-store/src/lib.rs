//! # mizan-store: Local Persistence for Mizan
//!
//! This crate provides the durable on-device copy of the aggregate State.
//! It uses SQLite for local storage with sqlx for async operations, and a
//! broadcast channel so subscribers observe every committed change.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Mizan Data Flow                                │
//! │                                                                         │
//! │  Ledger commit (mizan-sync)          UI subscription                   │
//! │       │                                    ▲                            │
//! │       ▼                                    │                            │
//! │  ┌─────────────────────────────────────────┴───────────────────────┐   │
//! │  │                   mizan-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  StateCache   │    │ Subscriptions │    │  Migrations  │  │   │
//! │  │   │  (cache.rs)   │    │(subscription) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ load / save   │───►│ watch(sel,cb) │    │ 001_state_   │  │   │
//! │  │   │ broadcast on  │    │ cancel handle │    │ documents.sql│  │   │
//! │  │   │ every save    │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │      state_documents: one JSON document per doc_key             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`cache`] - The StateCache: whole-document load/save + change broadcast
//! - [`subscription`] - Selector subscriptions with cancel handles
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mizan_store::{StateCache, StoreConfig};
//!
//! let cache = StateCache::open(StoreConfig::new("path/to/mizan.db")).await?;
//!
//! // Reads prefer local, absence is not an error
//! let state = cache.load_or_default().await?;
//!
//! // Every save notifies subscribers
//! cache.save(&state).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod error;
pub mod migrations;
pub mod subscription;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::{StateCache, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use subscription::{watch, SubscriptionHandle};
