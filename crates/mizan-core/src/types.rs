//! # Domain Types
//!
//! Core domain types used throughout Mizan.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │   Treasury      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  Transaction    │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  ─────────────  │       │
//! │  │  code (business)│   │  invoice_number │   │  direction      │       │
//! │  │  quantity       │   │  items[]        │   │  category       │       │
//! │  │  min_stock_alert│   │  debt_amount    │   │  method         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │    Supplier     │   │   Employee      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  total_debt     │   │  total_debt     │   │  base_salary    │       │
//! │  │  transactions[] │   │  (owed BY us)   │   │  role           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for references between entities
//! - Business ID where one exists: (product code, invoice_number) -
//!   human-readable, searchable
//!
//! ## Audit Rule
//! Entities are never hard-deleted. Debt and sales history must remain
//! auditable for the lifetime of the document.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code - unique, searchable key.
    pub code: String,

    /// Display name. Purchases match stock by this exact name.
    pub name: String,

    /// Product category (paint type, etc.).
    pub category: String,

    /// Size/packaging description.
    pub size: String,

    /// Cost per unit at purchase (for profit accounting).
    pub buy_price: Money,

    /// Selling price per unit.
    pub sell_price: Money,

    /// Current stock level.
    ///
    /// Kept >= 0 by ledger operations under normal use. A caller that
    /// skips the availability check can drive it negative - see
    /// [`Product::has_stock`].
    pub quantity: i64,

    /// Threshold below which the product counts as low-stock.
    pub min_stock_alert: i64,
}

impl Product {
    /// Checks whether the requested quantity can be sold from stock.
    ///
    /// `process_sale` does NOT re-run this check - the caller is expected
    /// to have done so before building the sale (trust-the-caller
    /// contract carried over from the original system).
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }

    /// Checks whether stock has fallen to or below the alert threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock_alert
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Kind of customer ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerTxKind {
    /// Amount the customer now owes (credit sale).
    Debt,
    /// Amount the customer paid back.
    Payment,
}

/// One entry in a customer's ordered debt/payment log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerTransaction {
    pub id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub amount: Money,
    pub kind: CustomerTxKind,
    pub note: String,
}

/// A customer with a running debt balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,

    /// Exact-match key for sale-time resolution (trimmed, case-sensitive).
    pub name: String,

    pub phone: String,

    /// Running balance owed to the business.
    ///
    /// Invariant: equals Σ Debt entries − Σ Payment entries. May go
    /// negative (over-payment); <= 0 reads as "settled".
    pub total_debt: Money,

    /// Ordered log of debt and payment entries.
    pub transactions: Vec<CustomerTransaction>,
}

impl Customer {
    /// Creates a new customer with a zero balance.
    pub fn new(id: impl Into<String>, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Customer {
            id: id.into(),
            name: name.into(),
            phone: phone.into(),
            total_debt: Money::zero(),
            transactions: Vec::new(),
        }
    }

    /// Recomputes the balance from the transaction log.
    ///
    /// Must always equal `total_debt` - exposed so tests and diagnostics
    /// can assert the invariant.
    pub fn recomputed_debt(&self) -> Money {
        self.transactions
            .iter()
            .map(|tx| match tx.kind {
                CustomerTxKind::Debt => tx.amount,
                CustomerTxKind::Payment => -tx.amount,
            })
            .sum()
    }

    /// A customer with no outstanding balance (or in credit) is settled.
    pub fn is_settled(&self) -> bool {
        !self.total_debt.is_positive()
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier the business buys from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub company: String,

    /// Amount the business owes the supplier.
    ///
    /// Increased by RecordPurchase, decreased by PaySupplierDebt.
    /// No floor at zero - negative means the supplier was overpaid.
    pub total_debt: Money,
}

// =============================================================================
// Employee
// =============================================================================

/// Employee role within the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeRole {
    Admin,
    Staff,
}

/// An employee profile.
///
/// Authentication lives outside the ledger; only the profile and base
/// salary matter here. The session layer hands operations an actor name
/// for attribution fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: EmployeeRole,
    pub base_salary: Money,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Card network terminal.
    Network,
    /// Bank transfer.
    Transfer,
    /// Credit sale - the unpaid portion becomes customer debt.
    Debt,
}

impl PaymentMethod {
    /// The treasury settlement channel for money that actually moved.
    ///
    /// A Debt sale settles its paid portion through the cash drawer,
    /// so treasury entries never carry the Debt method.
    pub fn settlement(&self) -> SettlementMethod {
        match self {
            PaymentMethod::Cash | PaymentMethod::Debt => SettlementMethod::Cash,
            PaymentMethod::Network => SettlementMethod::Network,
            PaymentMethod::Transfer => SettlementMethod::Transfer,
        }
    }
}

/// Channel through which treasury cash moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementMethod {
    Cash,
    Network,
    Transfer,
}

impl SettlementMethod {
    /// All settlement channels, for per-method balance reports.
    pub const ALL: [SettlementMethod; 3] = [
        SettlementMethod::Cash,
        SettlementMethod::Network,
        SettlementMethod::Transfer,
    ];
}

// =============================================================================
// Sale
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub product_id: String,

    /// Product name at time of sale (frozen).
    pub product_name: String,

    /// Quantity sold.
    pub quantity: i64,

    /// Quantity returned so far. Only ever increases, never above
    /// `quantity`.
    pub returned_quantity: i64,

    /// Unit selling price at time of sale (frozen).
    pub sell_price: Money,

    /// Unit cost at time of sale (frozen, for profit accounting).
    pub buy_price: Money,
}

impl SaleItem {
    /// Line total before returns (quantity × sell price).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.sell_price.multiply_quantity(self.quantity)
    }

    /// Units not yet returned.
    #[inline]
    pub fn remaining_quantity(&self) -> i64 {
        self.quantity - self.returned_quantity
    }
}

/// A completed sale invoice.
///
/// Immutable once created except for per-line `returned_quantity` and the
/// `is_return` flag, both owned by ProcessPartialReturn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,

    /// Monotonic, sequential, starts at 1, never reused - even when the
    /// sale is later fully returned.
    pub invoice_number: u64,

    #[ts(as = "String")]
    pub date: DateTime<Utc>,

    pub items: Vec<SaleItem>,

    /// Always Σ item.quantity × item.sell_price.
    pub total_amount: Money,

    /// What the customer actually handed over at sale time.
    pub paid_amount: Money,

    /// total_amount − paid_amount, always >= 0.
    pub debt_amount: Money,

    /// Set when the sale is tied to a customer (named or credit sale).
    pub customer_id: Option<String>,

    /// Customer display name ("cash customer" for anonymous sales).
    pub customer_name: String,

    /// Attribution: the acting employee's name from the session layer.
    pub employee_name: String,

    pub payment_method: PaymentMethod,

    /// True once any return has been applied against this sale.
    pub is_return: bool,
}

// =============================================================================
// Purchase
// =============================================================================

/// A purchase from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub supplier_id: String,

    /// Supplier name at time of purchase (frozen).
    pub supplier_name: String,

    /// Purchased item description. Stock only moves when a Product with
    /// this exact name exists.
    pub item_name: String,

    pub quantity: i64,
    pub total_cost: Money,
    pub paid_amount: Money,

    /// total_cost − paid_amount; added to the supplier's balance.
    pub debt_amount: Money,

    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

// =============================================================================
// Treasury
// =============================================================================

/// Direction of a treasury cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TreasuryDirection {
    In,
    Out,
}

/// Business category of a treasury entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TreasuryCategory {
    Sale,
    Return,
    Salary,
    Expense,
    DebtCollection,
    SupplierPayment,
}

/// An immutable, append-only cash movement entry.
///
/// This is the system's audit trail: the balance per settlement method is
/// always recomputable as Σ IN − Σ OUT over the full log, and must equal
/// the net cash effect of every ledger operation that moved money.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasuryTransaction {
    pub id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub amount: Money,
    pub direction: TreasuryDirection,
    pub category: TreasuryCategory,
    pub method: SettlementMethod,
    pub note: String,
}

// =============================================================================
// Payroll
// =============================================================================

/// A salary payment record.
///
/// Always paired with exactly one treasury OUT entry of equal net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalaryRecord {
    pub id: String,
    pub employee_id: String,

    /// Payment month as "YYYY-MM".
    pub month: String,

    /// Base salary at payment time.
    pub amount: Money,
    pub bonus: Money,
    pub deductions: Money,

    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub is_paid: bool,
}

impl SalaryRecord {
    /// Net amount paid out: base + bonus − deductions.
    #[inline]
    pub fn net(&self) -> Money {
        self.amount + self.bonus - self.deductions
    }
}

/// Attendance status for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// One attendance record per (employee, day).
///
/// Recording a second status for the same day overwrites, it does not
/// append - the id is derived from the pair to make that upsert natural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Attendance {
    /// Derived key: `"{employee_id}_{date}"`.
    pub id: String,
    pub employee_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

impl Attendance {
    /// Builds the derived upsert key for an (employee, day) pair.
    pub fn key(employee_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", employee_id, date)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_stock_helpers() {
        let product = Product {
            id: "p1".into(),
            code: "PNT-01".into(),
            name: "Matte White 5L".into(),
            category: "paint".into(),
            size: "5L".into(),
            buy_price: Money::from_cents(30_00),
            sell_price: Money::from_cents(45_00),
            quantity: 4,
            min_stock_alert: 5,
        };

        assert!(product.has_stock(4));
        assert!(!product.has_stock(5));
        assert!(product.is_low_stock());
    }

    #[test]
    fn test_customer_debt_recomputation() {
        let mut customer = Customer::new("c1", "Ahmed", "0100");
        customer.transactions.push(CustomerTransaction {
            id: "t1".into(),
            date: Utc::now(),
            amount: Money::from_cents(500_00),
            kind: CustomerTxKind::Debt,
            note: "Invoice #1".into(),
        });
        customer.transactions.push(CustomerTransaction {
            id: "t2".into(),
            date: Utc::now(),
            amount: Money::from_cents(200_00),
            kind: CustomerTxKind::Payment,
            note: "collection".into(),
        });
        customer.total_debt = Money::from_cents(300_00);

        assert_eq!(customer.recomputed_debt(), customer.total_debt);
        assert!(!customer.is_settled());
    }

    #[test]
    fn test_overpaid_customer_is_settled() {
        let mut customer = Customer::new("c1", "Ahmed", "0100");
        customer.total_debt = Money::from_cents(-50_00);
        assert!(customer.is_settled());
    }

    #[test]
    fn test_debt_settles_as_cash() {
        assert_eq!(PaymentMethod::Debt.settlement(), SettlementMethod::Cash);
        assert_eq!(PaymentMethod::Network.settlement(), SettlementMethod::Network);
        assert_eq!(PaymentMethod::Transfer.settlement(), SettlementMethod::Transfer);
    }

    #[test]
    fn test_sale_item_totals() {
        let item = SaleItem {
            product_id: "p1".into(),
            product_name: "Matte White 5L".into(),
            quantity: 3,
            returned_quantity: 1,
            sell_price: Money::from_cents(45_00),
            buy_price: Money::from_cents(30_00),
        };

        assert_eq!(item.line_total().cents(), 135_00);
        assert_eq!(item.remaining_quantity(), 2);
    }

    #[test]
    fn test_salary_net() {
        let record = SalaryRecord {
            id: "s1".into(),
            employee_id: "e1".into(),
            month: "2026-08".into(),
            amount: Money::from_cents(3000_00),
            bonus: Money::from_cents(500_00),
            deductions: Money::from_cents(200_00),
            date: Utc::now(),
            is_paid: true,
        };
        assert_eq!(record.net().cents(), 3300_00);
    }

    #[test]
    fn test_attendance_key() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert_eq!(Attendance::key("e1", date), "e1_2026-08-30");
    }
}
