//! Payroll: salary payments and daily attendance.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::ops::new_id;
use crate::state::State;
use crate::types::{
    Attendance, AttendanceStatus, SalaryRecord, SettlementMethod, TreasuryCategory,
    TreasuryDirection, TreasuryTransaction,
};
use crate::validation::validate_non_negative_amount;

/// Pays an employee's salary for the month containing `date`.
///
/// The net payout is `base + bonus − deductions`, where base is the
/// employee's current salary. Deductions may not exceed the gross
/// (base + bonus) so the treasury OUT entry stays positive. A zero net
/// still produces a salary record but no treasury entry.
pub fn pay_salary(
    state: State,
    employee_id: &str,
    bonus: Money,
    deductions: Money,
    date: DateTime<Utc>,
) -> LedgerResult<(State, SalaryRecord)> {
    validate_non_negative_amount("bonus", bonus)?;
    validate_non_negative_amount("deductions", deductions)?;
    let employee = state
        .find_employee(employee_id)
        .ok_or_else(|| LedgerError::EmployeeNotFound(employee_id.to_owned()))?;

    let base = employee.base_salary;
    let gross = base + bonus;
    if deductions > gross {
        return Err(LedgerError::DeductionsExceedGross { deductions, gross });
    }
    let employee_name = employee.name.clone();

    let record = SalaryRecord {
        id: new_id(),
        employee_id: employee_id.to_owned(),
        month: date.format("%Y-%m").to_string(),
        amount: base,
        bonus,
        deductions,
        date,
        is_paid: true,
    };
    let net = record.net();

    let mut state = state;
    if net.is_positive() {
        state.treasury.push(TreasuryTransaction {
            id: new_id(),
            date,
            amount: net,
            direction: TreasuryDirection::Out,
            category: TreasuryCategory::Salary,
            method: SettlementMethod::Cash,
            note: format!("Salary: {employee_name}"),
        });
    }
    state.salaries.push(record.clone());
    Ok((state, record))
}

/// Records (or overwrites) an employee's attendance for a day.
///
/// Keyed by `(employee_id, date)` so a correction replaces the earlier
/// entry instead of appending a duplicate.
pub fn record_attendance(
    state: State,
    employee_id: &str,
    date: NaiveDate,
    status: AttendanceStatus,
) -> LedgerResult<State> {
    if state.find_employee(employee_id).is_none() {
        return Err(LedgerError::EmployeeNotFound(employee_id.to_owned()));
    }
    let mut state = state;
    let key = Attendance::key(employee_id, date);
    let record = Attendance {
        id: key.clone(),
        employee_id: employee_id.to_owned(),
        date,
        status,
    };
    match state.attendance.iter_mut().find(|a| a.id == key) {
        Some(existing) => *existing = record,
        None => state.attendance.push(record),
    }
    Ok(state)
}

// ============================================================================
// Tests
// ============================================================================
