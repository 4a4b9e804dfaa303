//! # Aggregate State
//!
//! The single document holding every entity collection plus the invoice
//! counter. All ledger operations read the full State, compute a new
//! consistent State, and commit it as one atomic unit - a partially
//! applied operation (inventory updated but treasury not) is a
//! correctness violation, so nothing outside `ops` mutates collections
//! that compound transactions own.
//!
//! ## Document Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          State (one document)                           │
//! │                                                                         │
//! │  products[]   sales[]      purchases[]   treasury[]                     │
//! │  customers[]  suppliers[]  employees[]   salaries[]   attendance[]      │
//! │                                                                         │
//! │  last_invoice_number: u64                                               │
//! │                                                                         │
//! │  Persisted as ONE serialized row locally and ONE remote document.       │
//! │  Replication is whole-document last-writer-wins - no field merge.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why PartialEq?
//! The sync coordinator decides whether a remote document is "new" by
//! whole-document comparison (never by timestamp). Structural equality on
//! these types is equivalent to comparing their serialized forms, since
//! every field participates in serialization.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{
    Attendance, Customer, Employee, Product, Purchase, SalaryRecord, Sale, SettlementMethod,
    Supplier, TreasuryDirection, TreasuryTransaction,
};

// =============================================================================
// State
// =============================================================================

/// The aggregate root: every collection plus the invoice counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct State {
    pub products: Vec<Product>,
    pub sales: Vec<Sale>,
    pub purchases: Vec<Purchase>,
    pub employees: Vec<Employee>,
    pub suppliers: Vec<Supplier>,
    pub customers: Vec<Customer>,
    pub salaries: Vec<SalaryRecord>,
    pub attendance: Vec<Attendance>,
    pub treasury: Vec<TreasuryTransaction>,

    /// Last assigned invoice number. The next sale gets this + 1.
    pub last_invoice_number: u64,
}

impl State {
    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn find_product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn find_product_mut(&mut self, id: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    /// Exact-name product lookup, used by RecordPurchase stock matching.
    pub fn find_product_by_name_mut(&mut self, name: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.name == name)
    }

    pub fn find_customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    pub fn find_customer_mut(&mut self, id: &str) -> Option<&mut Customer> {
        self.customers.iter_mut().find(|c| c.id == id)
    }

    /// Case-sensitive exact name match on the trimmed name - no fuzzy
    /// merge, per the sale-time customer resolution contract.
    pub fn find_customer_by_name(&self, name: &str) -> Option<&Customer> {
        let name = name.trim();
        self.customers.iter().find(|c| c.name.trim() == name)
    }

    pub fn find_supplier(&self, id: &str) -> Option<&Supplier> {
        self.suppliers.iter().find(|s| s.id == id)
    }

    pub fn find_supplier_mut(&mut self, id: &str) -> Option<&mut Supplier> {
        self.suppliers.iter_mut().find(|s| s.id == id)
    }

    pub fn find_employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    pub fn find_sale(&self, id: &str) -> Option<&Sale> {
        self.sales.iter().find(|s| s.id == id)
    }

    pub fn find_sale_mut(&mut self, id: &str) -> Option<&mut Sale> {
        self.sales.iter_mut().find(|s| s.id == id)
    }

    // =========================================================================
    // Profile Upserts
    // =========================================================================
    // Product/Customer/Supplier/Employee basic profiles are the only
    // entities the UI may create/update directly - these upserts carry no
    // compound-transaction semantics. Nothing is ever hard-deleted.

    /// Inserts or replaces a product profile by id.
    pub fn upsert_product(&mut self, product: Product) {
        match self.find_product_mut(&product.id) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }

    /// Inserts or replaces a customer profile by id.
    pub fn upsert_customer(&mut self, customer: Customer) {
        match self.find_customer_mut(&customer.id) {
            Some(existing) => *existing = customer,
            None => self.customers.push(customer),
        }
    }

    /// Inserts or replaces a supplier profile by id.
    pub fn upsert_supplier(&mut self, supplier: Supplier) {
        match self.find_supplier_mut(&supplier.id) {
            Some(existing) => *existing = supplier,
            None => self.suppliers.push(supplier),
        }
    }

    /// Inserts or replaces an employee profile by id.
    pub fn upsert_employee(&mut self, employee: Employee) {
        match self.employees.iter_mut().find(|e| e.id == employee.id) {
            Some(existing) => *existing = employee,
            None => self.employees.push(employee),
        }
    }

    // =========================================================================
    // Treasury
    // =========================================================================

    /// Recomputes the balance for one settlement method from the full
    /// transaction log: Σ IN − Σ OUT.
    ///
    /// Must equal the net cash effect of every committed operation that
    /// moved money through that method - the audit-trail law.
    pub fn treasury_balance(&self, method: SettlementMethod) -> Money {
        self.treasury
            .iter()
            .filter(|tx| tx.method == method)
            .map(|tx| match tx.direction {
                TreasuryDirection::In => tx.amount,
                TreasuryDirection::Out => -tx.amount,
            })
            .sum()
    }

    /// Total balance across all settlement methods.
    pub fn treasury_total(&self) -> Money {
        SettlementMethod::ALL
            .iter()
            .map(|m| self.treasury_balance(*m))
            .sum()
    }

    /// Products at or below their stock alert threshold.
    pub fn low_stock_products(&self) -> Vec<&Product> {
        self.products.iter().filter(|p| p.is_low_stock()).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TreasuryCategory, TreasuryDirection};
    use chrono::Utc;

    fn tx(
        amount: i64,
        direction: TreasuryDirection,
        method: SettlementMethod,
    ) -> TreasuryTransaction {
        TreasuryTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            date: Utc::now(),
            amount: Money::from_cents(amount),
            direction,
            category: TreasuryCategory::Sale,
            method,
            note: String::new(),
        }
    }

    #[test]
    fn test_empty_state_is_zeroed() {
        let state = State::default();
        assert_eq!(state.last_invoice_number, 0);
        assert!(state.products.is_empty());
        assert!(state.treasury_total().is_zero());
    }

    #[test]
    fn test_treasury_balance_per_method() {
        let mut state = State::default();
        state.treasury.push(tx(500_00, TreasuryDirection::In, SettlementMethod::Cash));
        state.treasury.push(tx(200_00, TreasuryDirection::Out, SettlementMethod::Cash));
        state.treasury.push(tx(300_00, TreasuryDirection::In, SettlementMethod::Network));

        assert_eq!(state.treasury_balance(SettlementMethod::Cash).cents(), 300_00);
        assert_eq!(state.treasury_balance(SettlementMethod::Network).cents(), 300_00);
        assert_eq!(state.treasury_balance(SettlementMethod::Transfer).cents(), 0);
        assert_eq!(state.treasury_total().cents(), 600_00);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut state = State::default();
        state.upsert_customer(Customer::new("c1", "Ahmed", "0100"));
        state.upsert_customer(Customer::new("c1", "Ahmed Ali", "0111"));

        assert_eq!(state.customers.len(), 1);
        assert_eq!(state.customers[0].name, "Ahmed Ali");
    }

    #[test]
    fn test_find_customer_by_name_trims_exactly() {
        let mut state = State::default();
        state.upsert_customer(Customer::new("c1", "Ahmed", "0100"));

        assert!(state.find_customer_by_name(" Ahmed ").is_some());
        assert!(state.find_customer_by_name("ahmed").is_none()); // case-sensitive
    }

    #[test]
    fn test_state_equality_detects_changes() {
        let a = State::default();
        let mut b = a.clone();
        assert_eq!(a, b);

        b.last_invoice_number = 1;
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_survives_json_round_trip() {
        // Replication compares whole documents after a serialize/
        // deserialize cycle, so the round trip must be lossless.
        let mut state = State::default();
        state.last_invoice_number = 42;
        state.upsert_customer(Customer::new("c1", "Ahmed", "0100"));
        state.treasury.push(tx(500_00, TreasuryDirection::In, SettlementMethod::Cash));

        let json = serde_json::to_string(&state).unwrap();
        let restored: State = serde_json::from_str(&json).unwrap();
        assert_eq!(state, restored);
    }
}
