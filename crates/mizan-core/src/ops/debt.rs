//! Customer debt collection and by-name customer resolution.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::ops::new_id;
use crate::state::State;
use crate::types::{
    Customer, CustomerTransaction, CustomerTxKind, SettlementMethod, TreasuryCategory,
    TreasuryDirection, TreasuryTransaction,
};
use crate::validation::validate_positive_amount;

/// Resolves a customer by exact trimmed name, creating one if needed.
///
/// Returns the customer's id. The same trimmed name always resolves to
/// the same customer, so repeat credit sales accumulate on one record.
pub fn find_or_create_customer(state: &mut State, name: &str) -> String {
    let trimmed = name.trim();
    if let Some(existing) = state.find_customer_by_name(trimmed) {
        return existing.id.clone();
    }
    let customer = Customer::new(new_id(), trimmed, "");
    let id = customer.id.clone();
    state.customers.push(customer);
    id
}

/// Collects a payment against a customer's outstanding debt.
///
/// Appends a PAYMENT entry to the customer's log, reduces the balance
/// and records the cash as a treasury IN. The amount is not capped at
/// the balance; collecting more than is owed leaves the customer in
/// credit (negative debt).
pub fn collect_customer_debt(
    state: State,
    customer_id: &str,
    amount: Money,
    date: DateTime<Utc>,
) -> LedgerResult<State> {
    validate_positive_amount("amount", amount)?;
    let mut state = state;
    let customer = state
        .find_customer_mut(customer_id)
        .ok_or_else(|| LedgerError::CustomerNotFound(customer_id.to_owned()))?;

    customer.total_debt -= amount;
    customer.transactions.push(CustomerTransaction {
        id: new_id(),
        date,
        amount,
        kind: CustomerTxKind::Payment,
        note: "Debt collection".to_owned(),
    });
    let customer_name = customer.name.clone();

    state.treasury.push(TreasuryTransaction {
        id: new_id(),
        date,
        amount,
        direction: TreasuryDirection::In,
        category: TreasuryCategory::DebtCollection,
        method: SettlementMethod::Cash,
        note: format!("Debt collection: {customer_name}"),
    });
    Ok(state)
}

// ============================================================================
// Tests
// ============================================================================
