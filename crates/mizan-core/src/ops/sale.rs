//! The sale transaction: the busiest operation in the ledger.
//!
//! One sale atomically touches inventory, the invoice counter, the
//! treasury and (for credit sales) the customer's debt record. All
//! validation happens before the first mutation so a failed sale leaves
//! the state exactly as it was.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::ops::{new_id, CASH_CUSTOMER};
use crate::state::State;
use crate::types::{
    CustomerTransaction, CustomerTxKind, PaymentMethod, Sale, SaleItem, TreasuryCategory,
    TreasuryDirection, TreasuryTransaction,
};
use crate::validation::validate_quantity;

/// One cart line: a product reference and how many units to sell.
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Everything needed to run a sale.
#[derive(Debug, Clone)]
pub struct SaleInput {
    pub lines: Vec<SaleLine>,
    pub payment_method: PaymentMethod,
    /// Amount tendered now. The remainder (total - paid) becomes debt.
    pub paid_amount: Money,
    /// Required for credit sales, optional otherwise.
    pub customer_name: Option<String>,
    pub employee_name: String,
    pub date: DateTime<Utc>,
}

/// Processes a sale against the given state.
///
/// Effects, in order:
/// 1. Stock of every cart product is decremented by the sold quantity.
///    Stock MAY go negative: the register is the source of truth for
///    what physically left the shop, the alert threshold surfaces the
///    discrepancy instead.
/// 2. The invoice counter advances and stamps the sale.
/// 3. If any amount is unpaid, the customer (found or created by name)
///    receives a DEBT transaction for the remainder.
/// 4. If any amount was paid, the treasury records an IN entry under
///    the sale's settlement method.
pub fn process_sale(state: State, input: SaleInput) -> LedgerResult<(State, Sale)> {
    if input.lines.is_empty() {
        return Err(LedgerError::validation_required("items"));
    }
    for line in &input.lines {
        validate_quantity("quantity", line.quantity)?;
    }
    if input.paid_amount.is_negative() {
        return Err(LedgerError::validation_negative("paid_amount"));
    }

    // Resolve every product reference before touching anything.
    let mut items = Vec::with_capacity(input.lines.len());
    let mut total = Money::zero();
    for line in &input.lines {
        let product = state
            .find_product(&line.product_id)
            .ok_or_else(|| LedgerError::ProductNotFound(line.product_id.clone()))?;
        let item = SaleItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: line.quantity,
            returned_quantity: 0,
            sell_price: product.sell_price,
            buy_price: product.buy_price,
        };
        total += item.line_total();
        items.push(item);
    }

    if input.paid_amount > total {
        return Err(LedgerError::Overpaid {
            paid: input.paid_amount,
            total,
        });
    }
    let debt = total - input.paid_amount;

    let trimmed_name = input
        .customer_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if input.payment_method == PaymentMethod::Debt && trimmed_name.is_none() {
        return Err(LedgerError::validation_required("customer_name"));
    }

    // -- all validation passed; mutations start here --
    let mut state = state;

    for item in &items {
        if let Some(product) = state.find_product_mut(&item.product_id) {
            product.quantity -= item.quantity;
        }
    }

    state.last_invoice_number += 1;
    let invoice_number = state.last_invoice_number;

    // A named customer is attached even on fully-paid sales so the
    // purchase shows up in their history.
    let customer_id = match trimmed_name {
        Some(name) => {
            let id = crate::ops::find_or_create_customer(&mut state, name);
            if debt.is_positive() {
                let customer = state
                    .find_customer_mut(&id)
                    .ok_or_else(|| LedgerError::CustomerNotFound(id.clone()))?;
                customer.total_debt += debt;
                customer.transactions.push(CustomerTransaction {
                    id: new_id(),
                    kind: CustomerTxKind::Debt,
                    amount: debt,
                    date: input.date,
                    note: format!("Invoice #{invoice_number}"),
                });
            }
            Some(id)
        }
        None => None,
    };

    let sale = Sale {
        id: new_id(),
        invoice_number,
        date: input.date,
        items,
        total_amount: total,
        paid_amount: input.paid_amount,
        debt_amount: debt,
        customer_id,
        customer_name: trimmed_name
            .map(str::to_owned)
            .unwrap_or_else(|| CASH_CUSTOMER.to_owned()),
        employee_name: input.employee_name,
        payment_method: input.payment_method,
        is_return: false,
    };

    if input.paid_amount.is_positive() {
        state.treasury.push(TreasuryTransaction {
            id: new_id(),
            direction: TreasuryDirection::In,
            category: TreasuryCategory::Sale,
            method: input.payment_method.settlement(),
            amount: input.paid_amount,
            date: input.date,
            note: format!("Invoice #{invoice_number}"),
        });
    }

    state.sales.push(sale.clone());
    Ok((state, sale))
}

// ============================================================================
// Tests
// ============================================================================
