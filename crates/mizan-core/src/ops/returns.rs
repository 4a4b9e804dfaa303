//! Partial returns against an existing sale.
//!
//! The refund value splits two ways: first it offsets whatever the sale's
//! customer still owes, and only the remainder leaves the treasury as
//! cash. Returned units go back into stock at the quantities actually
//! accepted, which are capped by what is still returnable on each line.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::ops::new_id;
use crate::state::State;
use crate::types::{
    CustomerTransaction, CustomerTxKind, SettlementMethod, TreasuryCategory, TreasuryDirection,
    TreasuryTransaction,
};

/// Requested return quantity for one sale line, addressed by product id.
#[derive(Debug, Clone)]
pub struct ReturnLine {
    pub product_id: String,
    pub quantity: i64,
}

/// What a return actually did, after capping.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnOutcome {
    /// Units accepted back across all lines.
    pub returned_units: i64,
    /// Sell-price value of the accepted units.
    pub total_return: Money,
    /// Portion of the refund that cancelled customer debt.
    pub debt_offset: Money,
    /// Portion refunded in cash (treasury OUT).
    pub net_refund: Money,
}

/// Processes a partial return against a sale.
///
/// Requested quantities are capped per line at `quantity − returned_quantity`;
/// lines already fully returned contribute nothing. If, after capping, no
/// units remain, the operation is a no-op and the returned state is the
/// input state unchanged - callers should skip the commit when
/// `returned_units == 0`.
pub fn process_partial_return(
    state: State,
    sale_id: &str,
    lines: &[ReturnLine],
    date: DateTime<Utc>,
) -> LedgerResult<(State, ReturnOutcome)> {
    let sale = state
        .find_sale(sale_id)
        .ok_or_else(|| LedgerError::SaleNotFound(sale_id.to_owned()))?;

    // First pass: compute capped quantities and totals without mutating.
    let mut accepted: Vec<(usize, String, i64)> = Vec::new();
    let mut total_return = Money::zero();
    for line in lines {
        if line.quantity <= 0 {
            continue;
        }
        let Some((idx, item)) = sale
            .items
            .iter()
            .enumerate()
            .find(|(_, item)| item.product_id == line.product_id)
        else {
            continue;
        };
        let capped = line.quantity.min(item.remaining_quantity());
        if capped <= 0 {
            continue;
        }
        total_return += item.sell_price.multiply_quantity(capped);
        accepted.push((idx, item.product_id.clone(), capped));
    }

    let returned_units: i64 = accepted.iter().map(|(_, _, q)| q).sum();
    if returned_units == 0 {
        let outcome = ReturnOutcome {
            returned_units: 0,
            total_return: Money::zero(),
            debt_offset: Money::zero(),
            net_refund: Money::zero(),
        };
        return Ok((state, outcome));
    }

    // The customer reference must be resolvable before anything changes.
    let customer_id = sale.customer_id.clone();
    if let Some(id) = &customer_id {
        if state.find_customer(id).is_none() {
            return Err(LedgerError::CustomerNotFound(id.clone()));
        }
    }
    let invoice_number = sale.invoice_number;

    // -- mutations --
    let mut state = state;

    let debt_offset = match &customer_id {
        Some(id) => {
            let customer = state
                .find_customer_mut(id)
                .ok_or_else(|| LedgerError::CustomerNotFound(id.clone()))?;
            // A balance already at or below zero offsets nothing.
            let offset = customer.total_debt.clamp_non_negative().min(total_return);
            if offset.is_positive() {
                customer.total_debt -= offset;
                customer.transactions.push(CustomerTransaction {
                    id: new_id(),
                    date,
                    amount: offset,
                    kind: CustomerTxKind::Payment,
                    note: format!("Return against invoice #{invoice_number}"),
                });
            }
            offset
        }
        None => Money::zero(),
    };
    let net_refund = total_return - debt_offset;

    if let Some(sale) = state.find_sale_mut(sale_id) {
        sale.is_return = true;
        for (idx, _, qty) in &accepted {
            sale.items[*idx].returned_quantity += qty;
        }
    }
    for (_, product_id, qty) in &accepted {
        if let Some(product) = state.find_product_mut(product_id) {
            product.quantity += qty;
        }
    }

    if net_refund.is_positive() {
        state.treasury.push(TreasuryTransaction {
            id: new_id(),
            date,
            amount: net_refund,
            direction: TreasuryDirection::Out,
            category: TreasuryCategory::Return,
            method: SettlementMethod::Cash,
            note: format!("Return against invoice #{invoice_number}"),
        });
    }

    let outcome = ReturnOutcome {
        returned_units,
        total_return,
        debt_offset,
        net_refund,
    };
    Ok((state, outcome))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{process_sale, SaleInput, SaleLine};
    use crate::types::{PaymentMethod, Product};

    fn seeded_sale(method: PaymentMethod, paid: i64, customer: Option<&str>) -> (State, String) {
        let mut state = State::default();
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
        let input = SaleInput {
            lines: vec![SaleLine {
                product_id: "p1".to_owned(),
                quantity: 4,
            }],
            payment_method: method,
            paid_amount: Money::from_cents(paid),
            customer_name: customer.map(str::to_owned),
            employee_name: "clerk".to_owned(),
            date: Utc::now(),
        };
        let (state, sale) = process_sale(state, input).unwrap();
        (state, sale.id)
    }

    fn line(quantity: i64) -> ReturnLine {
        ReturnLine {
            product_id: "p1".to_owned(),
            quantity,
        }
    }

    #[test]
    fn cash_sale_return_refunds_in_cash() {
        let (state, sale_id) = seeded_sale(PaymentMethod::Cash, 4000, None);
        let (state, outcome) =
            process_partial_return(state, &sale_id, &[line(2)], Utc::now()).unwrap();

        assert_eq!(outcome.returned_units, 2);
        assert_eq!(outcome.total_return, Money::from_cents(2000));
        assert_eq!(outcome.debt_offset, Money::zero());
        assert_eq!(outcome.net_refund, Money::from_cents(2000));
        // Stock restored from 6 back to 8.
        assert_eq!(state.find_product("p1").unwrap().quantity, 8);
        let refund = state.treasury.last().unwrap();
        assert_eq!(refund.direction, TreasuryDirection::Out);
        assert_eq!(refund.category, TreasuryCategory::Return);
        assert_eq!(refund.amount, Money::from_cents(2000));
        assert!(state.sales[0].is_return);
        assert_eq!(state.sales[0].items[0].returned_quantity, 2);
    }

    #[test]
    fn return_offsets_debt_before_cash() {
        // Total 4000, paid 1000 -> customer owes 3000. Returning all 4
        // units is worth 4000: 3000 cancels the debt, 1000 leaves in cash.
        let (state, sale_id) = seeded_sale(PaymentMethod::Debt, 1000, Some("Alice"));
        let (state, outcome) =
            process_partial_return(state, &sale_id, &[line(4)], Utc::now()).unwrap();

        assert_eq!(outcome.debt_offset, Money::from_cents(3000));
        assert_eq!(outcome.net_refund, Money::from_cents(1000));
        let customer = &state.customers[0];
        assert_eq!(customer.total_debt, Money::zero());
        // The offset shows up in the transaction log, keeping the
        // balance recomputable.
        assert_eq!(customer.recomputed_debt(), customer.total_debt);
        assert_eq!(
            customer.transactions.last().unwrap().kind,
            CustomerTxKind::Payment
        );
    }

    #[test]
    fn return_fully_absorbed_by_debt_moves_no_cash() {
        let (state, sale_id) = seeded_sale(PaymentMethod::Debt, 0, Some("Bob"));
        let treasury_before = state.treasury.len();
        let (state, outcome) =
            process_partial_return(state, &sale_id, &[line(2)], Utc::now()).unwrap();

        assert_eq!(outcome.debt_offset, Money::from_cents(2000));
        assert_eq!(outcome.net_refund, Money::zero());
        assert_eq!(state.treasury.len(), treasury_before);
        assert_eq!(state.customers[0].total_debt, Money::from_cents(2000));
    }

    #[test]
    fn quantities_cap_at_remaining() {
        let (state, sale_id) = seeded_sale(PaymentMethod::Cash, 4000, None);
        let (state, _) = process_partial_return(state, &sale_id, &[line(3)], Utc::now()).unwrap();
        // Only 1 unit is still returnable; a request for 5 caps at 1.
        let (state, outcome) =
            process_partial_return(state, &sale_id, &[line(5)], Utc::now()).unwrap();

        assert_eq!(outcome.returned_units, 1);
        assert_eq!(state.sales[0].items[0].returned_quantity, 4);
        assert_eq!(state.find_product("p1").unwrap().quantity, 10);
    }

    #[test]
    fn exhausted_lines_make_the_return_a_noop() {
        let (state, sale_id) = seeded_sale(PaymentMethod::Cash, 4000, None);
        let (state, _) = process_partial_return(state, &sale_id, &[line(4)], Utc::now()).unwrap();
        let before = state.clone();
        let (state, outcome) =
            process_partial_return(state, &sale_id, &[line(2)], Utc::now()).unwrap();

        assert_eq!(outcome.returned_units, 0);
        assert_eq!(outcome.net_refund, Money::zero());
        assert_eq!(state, before);
    }

    #[test]
    fn invoice_numbers_are_not_reused_after_a_full_return() {
        let (state, sale_id) = seeded_sale(PaymentMethod::Cash, 4000, None);
        let (state, outcome) =
            process_partial_return(state, &sale_id, &[line(4)], Utc::now()).unwrap();
        assert_eq!(outcome.returned_units, 4);

        let input = SaleInput {
            lines: vec![SaleLine {
                product_id: "p1".to_owned(),
                quantity: 1,
            }],
            payment_method: PaymentMethod::Cash,
            paid_amount: Money::from_cents(1000),
            customer_name: None,
            employee_name: "clerk".to_owned(),
            date: Utc::now(),
        };
        let (_, sale) = process_sale(state, input).unwrap();
        // The counter never rewinds, even when the prior sale came back whole.
        assert_eq!(sale.invoice_number, 2);
    }

    #[test]
    fn unknown_sale_is_an_error() {
        let (state, _) = seeded_sale(PaymentMethod::Cash, 4000, None);
        let err = process_partial_return(state, "nope", &[line(1)], Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::SaleNotFound(_)));
    }

    #[test]
    fn dangling_customer_reference_aborts() {
        let (mut state, sale_id) = seeded_sale(PaymentMethod::Debt, 0, Some("Carol"));
        state.customers.clear();
        let before = state.clone();
        let err = process_partial_return(state.clone(), &sale_id, &[line(1)], Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::CustomerNotFound(_)));
        assert_eq!(state, before);
    }

    #[test]
    fn unknown_product_lines_are_skipped() {
        let (state, sale_id) = seeded_sale(PaymentMethod::Cash, 4000, None);
        let lines = [
            ReturnLine {
                product_id: "ghost".to_owned(),
                quantity: 3,
            },
            line(1),
        ];
        let (_, outcome) = process_partial_return(state, &sale_id, &lines, Utc::now()).unwrap();
        assert_eq!(outcome.returned_units, 1);
    }
}
