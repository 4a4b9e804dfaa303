//! # Error Types
//!
//! Domain-specific error types for mizan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mizan-core errors (this file)                                         │
//! │  ├── LedgerError      - Compound transaction failures                  │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  mizan-store errors (separate crate)                                   │
//! │  └── StoreError       - Local document persistence failures            │
//! │                                                                         │
//! │  mizan-sync errors (separate crate)                                    │
//! │  ├── SyncError        - Transport/config failures (never surfaced      │
//! │  │                      synchronously to ledger callers)               │
//! │  └── ServiceError     - What callers of the Ledger service see         │
//! │                                                                         │
//! │  Flow: ValidationError → LedgerError → ServiceError → Caller           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (id, field, etc.)
//! 3. Errors are enum variants, never String
//! 4. A failed operation leaves the State untouched - no partial commits

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Ledger Error
// =============================================================================

/// Compound transaction errors.
///
/// Every variant means the operation aborted cleanly: no entity was mutated
/// and nothing was committed.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A sale line referenced a product id that is not in the State.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The sale id passed to a return does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Customer id not found for a debt collection.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Supplier id not found for a purchase or debt payment.
    #[error("Supplier not found: {0}")]
    SupplierNotFound(String),

    /// Employee id not found for payroll or attendance.
    #[error("Employee not found: {0}")]
    EmployeeNotFound(String),

    /// Paid amount exceeds the sale total / purchase cost (the debt
    /// remainder must stay >= 0).
    #[error("Paid amount {paid} exceeds total {total}")]
    Overpaid { paid: Money, total: Money },

    /// Salary deductions exceed base + bonus (treasury OUT must stay >= 0).
    #[error("Deductions {deductions} exceed gross salary {gross}")]
    DeductionsExceedGross { deductions: Money, gross: Money },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl LedgerError {
    /// Shorthand for a missing/empty required field.
    pub fn validation_required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_owned(),
        }
        .into()
    }

    /// Shorthand for a field that must not be negative.
    pub fn validation_negative(field: &str) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.to_owned(),
        }
        .into()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when an operation input doesn't meet requirements.
/// Callers learn exactly which field failed.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid month string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
