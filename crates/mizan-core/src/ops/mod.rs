//! # Ledger Operations
//!
//! The compound transactions: each one is a pure function
//! `(State, input) -> Result<(new State, derived result)>`.
//!
//! ## Operation Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Compound Transaction Shape                          │
//! │                                                                         │
//! │  ProcessSale ───────── inventory − cart                                │
//! │                        customer debt + unpaid remainder                │
//! │                        treasury IN (paid portion)                      │
//! │                        invoice counter + 1                             │
//! │                                                                         │
//! │  ProcessPartialReturn  inventory + returned units                      │
//! │                        customer debt − offset                          │
//! │                        treasury OUT (net refund)                       │
//! │                                                                         │
//! │  RecordPurchase ────── inventory + quantity (exact-name match)         │
//! │                        supplier debt + unpaid remainder                │
//! │                        treasury OUT (paid portion)                     │
//! │                                                                         │
//! │  The entities an operation touches NEVER disagree: the treasury        │
//! │  entry equals the money that moved, the stock delta equals the         │
//! │  items that moved, the debt delta equals the unpaid remainder.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! 1. Validate everything BEFORE mutating anything - a returned error
//!    means the input State is untouched and nothing may be committed.
//! 2. No I/O. The caller (the Ledger service in mizan-sync) owns the
//!    read-snapshot / commit cycle and its serialization.
//! 3. Entities are appended, never removed - history stays auditable.

mod debt;
mod payroll;
mod purchase;
mod returns;
mod sale;

pub use debt::{collect_customer_debt, find_or_create_customer};
pub use payroll::{pay_salary, record_attendance};
pub use purchase::{pay_supplier_debt, record_purchase, PurchaseInput, PurchaseOutcome};
pub use returns::{process_partial_return, ReturnLine, ReturnOutcome};
pub use sale::{process_sale, SaleInput, SaleLine};

/// Display name for sales without a named customer.
pub const CASH_CUSTOMER: &str = "Cash customer";

/// Generates a new entity id (UUID v4 - offline-safe, no coordination).
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
