//! # mizan-core: Pure Business Logic for Mizan
//!
//! This crate is the **heart** of Mizan, the small-business operations
//! ledger. It contains every compound transaction as a pure function with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Mizan Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Frontend / Presentation Layer                   │   │
//! │  │     Sales UI ──► Inventory UI ──► Debts UI ──► Reports UI      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              mizan-sync (Ledger Service + Sync)                 │   │
//! │  │       serialized commits • remote replication • config          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mizan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   state   │  │    ops    │  │  reports  │  │   │
//! │  │   │  Product  │  │   State   │  │   sales   │  │ aggregates│  │   │
//! │  │   │   Sale    │  │  lookups  │  │  returns  │  │ summarize │  │   │
//! │  │   │  Customer │  │  upserts  │  │  payroll  │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 mizan-store (Persistence Layer)                 │   │
//! │  │        SQLite document cache, migrations, subscriptions         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Customer, Supplier, etc.)
//! - [`state`] - The aggregate State container and its lookup helpers
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ops`] - Compound transactions: `(State, input) -> (State, result)`
//! - [`reports`] - Sales aggregates and the summarization seam
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every operation is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Atomic State**: Operations take the whole State and return a new one -
//!    a returned error means nothing changed
//!
//! ## Example Usage
//!
//! ```rust
//! use mizan_core::money::Money;
//! use mizan_core::state::State;
//!
//! let state = State::default();
//!
//! // Money is always minor units (never floats!)
//! let price = Money::from_cents(1099); // 10.99
//! assert_eq!(price.cents(), 1099);
//!
//! // The empty State is the cold-start document.
//! assert_eq!(state.last_invoice_number, 0);
//! assert_eq!(state.treasury_total(), Money::zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod ops;
pub mod reports;
pub mod state;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mizan_core::Money` instead of
// `use mizan_core::money::Money`

pub use error::{LedgerError, LedgerResult, ValidationError};
pub use money::Money;
pub use reports::{FallbackSummarizer, SalesAggregates, Summarizer};
pub use state::State;
pub use types::*;
