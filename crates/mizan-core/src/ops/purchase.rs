//! Supplier-side operations: recording purchases and paying down
//! supplier debt.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::ops::new_id;
use crate::state::State;
use crate::types::{
    Purchase, SettlementMethod, TreasuryCategory, TreasuryDirection, TreasuryTransaction,
};
use crate::validation::{validate_name, validate_positive_amount, validate_quantity};

/// Input for a stock purchase from a supplier.
#[derive(Debug, Clone)]
pub struct PurchaseInput {
    pub supplier_id: String,
    /// Free-text item name; restocks the product whose name matches
    /// exactly (trimmed), if one exists.
    pub item_name: String,
    pub quantity: i64,
    pub total_cost: Money,
    pub paid_amount: Money,
    pub date: DateTime<Utc>,
}

/// Result of recording a purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOutcome {
    pub purchase: Purchase,
    /// False when no product name matched and inventory was untouched.
    /// Callers should surface this - the purchase record still exists
    /// but the stock count did not move.
    pub stock_applied: bool,
}

/// Records a purchase of stock from a supplier.
///
/// The unpaid remainder (`total_cost − paid_amount`) is added to the
/// supplier's debt. The paid portion leaves the treasury as an OUT entry.
/// Inventory is matched by exact trimmed product name; a miss is not an
/// error, it is reported through [`PurchaseOutcome::stock_applied`].
pub fn record_purchase(state: State, input: PurchaseInput) -> LedgerResult<(State, PurchaseOutcome)> {
    let item_name = validate_name("item_name", &input.item_name)?;
    validate_quantity("quantity", input.quantity)?;
    validate_positive_amount("total_cost", input.total_cost)?;
    if input.paid_amount.is_negative() {
        return Err(LedgerError::validation_negative("paid_amount"));
    }
    if input.paid_amount > input.total_cost {
        return Err(LedgerError::Overpaid {
            paid: input.paid_amount,
            total: input.total_cost,
        });
    }
    let supplier_name = state
        .find_supplier(&input.supplier_id)
        .map(|s| s.name.clone())
        .ok_or_else(|| LedgerError::SupplierNotFound(input.supplier_id.clone()))?;
    let debt = input.total_cost - input.paid_amount;

    // -- mutations --
    let mut state = state;

    let stock_applied = match state.find_product_by_name_mut(&item_name) {
        Some(product) => {
            product.quantity += input.quantity;
            true
        }
        None => false,
    };

    if debt.is_positive() {
        if let Some(supplier) = state.find_supplier_mut(&input.supplier_id) {
            supplier.total_debt += debt;
        }
    }

    if input.paid_amount.is_positive() {
        state.treasury.push(TreasuryTransaction {
            id: new_id(),
            date: input.date,
            amount: input.paid_amount,
            direction: TreasuryDirection::Out,
            category: TreasuryCategory::SupplierPayment,
            method: SettlementMethod::Cash,
            note: format!("Purchase: {item_name}"),
        });
    }

    let purchase = Purchase {
        id: new_id(),
        supplier_id: input.supplier_id,
        supplier_name,
        item_name,
        quantity: input.quantity,
        total_cost: input.total_cost,
        paid_amount: input.paid_amount,
        debt_amount: debt,
        date: input.date,
    };
    state.purchases.push(purchase.clone());

    Ok((
        state,
        PurchaseOutcome {
            purchase,
            stock_applied,
        },
    ))
}

/// Pays down a supplier's outstanding debt.
///
/// The amount must be positive but is NOT capped at the current balance;
/// overpaying drives the balance negative, which reads as supplier credit.
pub fn pay_supplier_debt(
    state: State,
    supplier_id: &str,
    amount: Money,
    date: DateTime<Utc>,
) -> LedgerResult<State> {
    validate_positive_amount("amount", amount)?;
    let mut state = state;
    let supplier = state
        .find_supplier_mut(supplier_id)
        .ok_or_else(|| LedgerError::SupplierNotFound(supplier_id.to_owned()))?;
    supplier.total_debt -= amount;
    let supplier_name = supplier.name.clone();

    state.treasury.push(TreasuryTransaction {
        id: new_id(),
        date,
        amount,
        direction: TreasuryDirection::Out,
        category: TreasuryCategory::SupplierPayment,
        method: SettlementMethod::Cash,
        note: format!("Debt payment: {supplier_name}"),
    });
    Ok(state)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Product, Supplier};

    fn base_state() -> State {
        let mut state = State::default();
        state.suppliers.push(Supplier {
            id: "s1".to_owned(),
            name: "Acme Trading".to_owned(),
            phone: "555-0100".to_owned(),
            company: "Acme".to_owned(),
            total_debt: Money::zero(),
        });
        state.products.push(Product {
            id: "p1".to_owned(),
            code: "C-p1".to_owned(),
            name: "Widget".to_owned(),
            category: "general".to_owned(),
            size: String::new(),
            buy_price: Money::from_cents(500),
            sell_price: Money::from_cents(1000),
            quantity: 10,
            min_stock_alert: 2,
        });
        state
    }

    fn input(item: &str, qty: i64, cost: i64, paid: i64) -> PurchaseInput {
        PurchaseInput {
            supplier_id: "s1".to_owned(),
            item_name: item.to_owned(),
            quantity: qty,
            total_cost: Money::from_cents(cost),
            paid_amount: Money::from_cents(paid),
            date: Utc::now(),
        }
    }

    #[test]
    fn purchase_restocks_matching_product() {
        let (state, outcome) = record_purchase(base_state(), input("Widget", 5, 2500, 2500)).unwrap();
        assert!(outcome.stock_applied);
        assert_eq!(state.find_product("p1").unwrap().quantity, 15);
        assert_eq!(outcome.purchase.debt_amount, Money::zero());
        assert_eq!(state.suppliers[0].total_debt, Money::zero());
        let out = state.treasury.last().unwrap();
        assert_eq!(out.direction, TreasuryDirection::Out);
        assert_eq!(out.category, TreasuryCategory::SupplierPayment);
        assert_eq!(out.amount, Money::from_cents(2500));
    }

    #[test]
    fn unmatched_name_records_purchase_without_restock() {
        let (state, outcome) =
            record_purchase(base_state(), input("Unknown Thing", 3, 900, 900)).unwrap();
        assert!(!outcome.stock_applied);
        assert_eq!(state.find_product("p1").unwrap().quantity, 10);
        assert_eq!(state.purchases.len(), 1);
    }

    #[test]
    fn unpaid_remainder_becomes_supplier_debt() {
        let (state, outcome) = record_purchase(base_state(), input("Widget", 5, 2500, 1000)).unwrap();
        assert_eq!(outcome.purchase.debt_amount, Money::from_cents(1500));
        assert_eq!(state.suppliers[0].total_debt, Money::from_cents(1500));
        assert_eq!(state.treasury.last().unwrap().amount, Money::from_cents(1000));
    }

    #[test]
    fn fully_unpaid_purchase_touches_no_treasury() {
        let (state, _) = record_purchase(base_state(), input("Widget", 5, 2500, 0)).unwrap();
        assert!(state.treasury.is_empty());
        assert_eq!(state.suppliers[0].total_debt, Money::from_cents(2500));
    }

    #[test]
    fn overpaying_a_purchase_is_rejected() {
        let err = record_purchase(base_state(), input("Widget", 5, 2500, 3000)).unwrap_err();
        assert!(matches!(err, LedgerError::Overpaid { .. }));
    }

    #[test]
    fn unknown_supplier_is_rejected() {
        let mut bad = input("Widget", 5, 2500, 0);
        bad.supplier_id = "nope".to_owned();
        let err = record_purchase(base_state(), bad).unwrap_err();
        assert!(matches!(err, LedgerError::SupplierNotFound(_)));
    }

    #[test]
    fn debt_payment_reduces_balance_and_moves_cash() {
        let (state, _) = record_purchase(base_state(), input("Widget", 5, 2500, 0)).unwrap();
        let state = pay_supplier_debt(state, "s1", Money::from_cents(1000), Utc::now()).unwrap();
        assert_eq!(state.suppliers[0].total_debt, Money::from_cents(1500));
        let out = state.treasury.last().unwrap();
        assert_eq!(out.category, TreasuryCategory::SupplierPayment);
        assert_eq!(out.amount, Money::from_cents(1000));
    }

    #[test]
    fn overpaying_debt_goes_negative() {
        let state = pay_supplier_debt(base_state(), "s1", Money::from_cents(500), Utc::now()).unwrap();
        assert_eq!(state.suppliers[0].total_debt, Money::from_cents(-500));
    }

    #[test]
    fn zero_debt_payment_is_rejected() {
        let err = pay_supplier_debt(base_state(), "s1", Money::zero(), Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
