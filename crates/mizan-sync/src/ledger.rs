//! # Ledger Service
//!
//! The application-facing entry point: serialized commits over the pure
//! core operations, persisted and replicated through the coordinator.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Commit Pipeline                              │
//! │                                                                     │
//! │  caller ──► commit lock ──► snapshot current State                  │
//! │                 │                   │                               │
//! │                 │                   ▼                               │
//! │                 │          pure op: (State, input)                  │
//! │                 │                → (State', derived)                │
//! │                 │                   │                               │
//! │                 │          Err? ──► released, nothing committed     │
//! │                 │                   │ Ok                            │
//! │                 │                   ▼                               │
//! │                 └────────► coordinator.commit(State')              │
//! │                              (local save + remote push)             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A single async mutex serializes every read-modify-write cycle, so two
//! overlapping operations always compose: the second one starts from the
//! first one's committed State instead of a stale snapshot. Reads take a
//! snapshot without touching the lock.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use mizan_core::ops;
use mizan_core::{
    AttendanceStatus, Customer, Employee, LedgerResult, Money, Product, SalaryRecord, Sale,
    SalesAggregates, State, Summarizer, Supplier,
};
use mizan_store::StateCache;

use crate::config::SyncConfig;
use crate::coordinator::SyncCoordinator;
use crate::error::{ServiceResult, SyncResult};
use crate::remote::RemoteReplica;
use crate::transport::{TransportConfig, WsReplica};

pub use mizan_core::ops::{PurchaseInput, PurchaseOutcome, ReturnLine, ReturnOutcome, SaleInput};

/// The operations ledger: every business mutation goes through here.
pub struct Ledger {
    coordinator: SyncCoordinator,
    commit_lock: Mutex<()>,
}

impl Ledger {
    /// Builds a ledger on an already-started coordinator.
    pub fn new(coordinator: SyncCoordinator) -> Self {
        Ledger {
            coordinator,
            commit_lock: Mutex::new(()),
        }
    }

    /// Opens a ledger from configuration: local-only when the remote is
    /// disabled, WebSocket-replicated when it is enabled.
    pub async fn open(config: &SyncConfig, cache: StateCache) -> ServiceResult<Self> {
        let remote: Option<Arc<dyn RemoteReplica>> = if config.is_remote_enabled() {
            Some(Arc::new(connect_replica(config)?))
        } else {
            None
        };
        let coordinator =
            SyncCoordinator::start(cache, remote, config.document_key().to_owned()).await?;
        Ok(Ledger::new(coordinator))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A snapshot of the committed State.
    pub async fn state(&self) -> Arc<State> {
        self.coordinator.current().await
    }

    /// Sales aggregates computed from the current State.
    pub async fn aggregates(&self) -> SalesAggregates {
        SalesAggregates::from_state(&*self.state().await)
    }

    /// A human-readable summary, degrading to the arithmetic fallback if
    /// the summarizer fails.
    pub async fn summary<S: Summarizer>(&self, summarizer: &S) -> String {
        summarizer.summarize_or_fallback(&self.aggregates().await)
    }

    /// Subscribes to committed State changes (local commits and adopted
    /// remote documents alike).
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<State>> {
        self.coordinator.cache().subscribe()
    }

    /// The backing cache, for selector subscriptions.
    pub fn cache(&self) -> &StateCache {
        self.coordinator.cache()
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale invoice.
    pub async fn process_sale(&self, input: SaleInput) -> ServiceResult<Sale> {
        let sale = self.apply(|state| ops::process_sale(state, input)).await?;
        info!(
            invoice = sale.invoice_number,
            total = %sale.total_amount,
            debt = %sale.debt_amount,
            "Sale recorded"
        );
        Ok(sale)
    }

    /// Applies a partial return against an existing sale.
    ///
    /// When every requested line is already exhausted the operation is a
    /// no-op: nothing is committed and the zeroed outcome is returned.
    pub async fn process_partial_return(
        &self,
        sale_id: &str,
        lines: &[ReturnLine],
        date: DateTime<Utc>,
    ) -> ServiceResult<ReturnOutcome> {
        let _guard = self.commit_lock.lock().await;
        let snapshot = (*self.coordinator.current().await).clone();
        let (next, outcome) = ops::process_partial_return(snapshot, sale_id, lines, date)?;
        if outcome.returned_units == 0 {
            info!(sale_id, "Return request had no returnable units, nothing committed");
            return Ok(outcome);
        }
        self.coordinator.commit(next).await?;
        info!(
            sale_id,
            units = outcome.returned_units,
            refund = %outcome.net_refund,
            offset = %outcome.debt_offset,
            "Return processed"
        );
        Ok(outcome)
    }

    // =========================================================================
    // Purchasing
    // =========================================================================

    /// Records a purchase from a supplier.
    pub async fn record_purchase(&self, input: PurchaseInput) -> ServiceResult<PurchaseOutcome> {
        let outcome = self
            .apply(|state| ops::record_purchase(state, input))
            .await?;
        if !outcome.stock_applied {
            // The purchase is still booked; only the stock move was skipped.
            warn!(
                item = %outcome.purchase.item_name,
                "Purchased item matches no product by name, stock unchanged"
            );
        }
        Ok(outcome)
    }

    /// Pays down a supplier's outstanding balance.
    pub async fn pay_supplier_debt(
        &self,
        supplier_id: &str,
        amount: Money,
        date: DateTime<Utc>,
    ) -> ServiceResult<()> {
        self.apply(|state| ops::pay_supplier_debt(state, supplier_id, amount, date).map(ok_unit))
            .await
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Collects a payment against a customer's debt.
    pub async fn collect_customer_debt(
        &self,
        customer_id: &str,
        amount: Money,
        date: DateTime<Utc>,
    ) -> ServiceResult<()> {
        self.apply(|state| ops::collect_customer_debt(state, customer_id, amount, date).map(ok_unit))
            .await
    }

    /// Finds a customer by trimmed name or creates one, returning the id.
    pub async fn find_or_create_customer(&self, name: &str) -> ServiceResult<String> {
        self.apply(|mut state| {
            let id = ops::find_or_create_customer(&mut state, name);
            Ok((state, id))
        })
        .await
    }

    // =========================================================================
    // Payroll
    // =========================================================================

    /// Pays an employee's salary for the month containing `date`.
    pub async fn pay_salary(
        &self,
        employee_id: &str,
        bonus: Money,
        deductions: Money,
        date: DateTime<Utc>,
    ) -> ServiceResult<SalaryRecord> {
        let record = self
            .apply(|state| ops::pay_salary(state, employee_id, bonus, deductions, date))
            .await?;
        info!(employee = %record.employee_id, month = %record.month, net = %record.net(), "Salary paid");
        Ok(record)
    }

    /// Records or corrects an employee's attendance for a day.
    pub async fn record_attendance(
        &self,
        employee_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> ServiceResult<()> {
        self.apply(|state| ops::record_attendance(state, employee_id, date, status).map(ok_unit))
            .await
    }

    // =========================================================================
    // Profile upserts
    // =========================================================================

    pub async fn upsert_product(&self, product: Product) -> ServiceResult<()> {
        self.apply(|mut state| {
            mizan_core::validation::validate_code(&product.code)?;
            state.upsert_product(product);
            Ok((state, ()))
        })
        .await
    }

    pub async fn upsert_customer(&self, customer: Customer) -> ServiceResult<()> {
        self.apply(|mut state| {
            state.upsert_customer(customer);
            Ok((state, ()))
        })
        .await
    }

    pub async fn upsert_supplier(&self, supplier: Supplier) -> ServiceResult<()> {
        self.apply(|mut state| {
            state.upsert_supplier(supplier);
            Ok((state, ()))
        })
        .await
    }

    pub async fn upsert_employee(&self, employee: Employee) -> ServiceResult<()> {
        self.apply(|mut state| {
            state.upsert_employee(employee);
            Ok((state, ()))
        })
        .await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stops the replication tasks. Local reads and writes keep working.
    pub async fn shutdown(&mut self) {
        self.coordinator.shutdown().await;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// The read-modify-write cycle every mutation runs through.
    ///
    /// Holding the lock across snapshot, op and commit is what makes
    /// concurrent operations compose instead of clobbering each other.
    async fn apply<T>(
        &self,
        op: impl FnOnce(State) -> LedgerResult<(State, T)>,
    ) -> ServiceResult<T> {
        let _guard = self.commit_lock.lock().await;
        let snapshot = (*self.coordinator.current().await).clone();
        let (next, derived) = op(snapshot)?;
        self.coordinator.commit(next).await?;
        Ok(derived)
    }
}

fn ok_unit(state: State) -> (State, ()) {
    (state, ())
}

/// Spawns the WebSocket replica from validated remote settings.
fn connect_replica(config: &SyncConfig) -> SyncResult<WsReplica> {
    config.validate()?;
    let transport = TransportConfig::from_remote_settings(&config.remote)?;
    Ok(WsReplica::spawn(transport))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::remote::MemoryReplica;
    use mizan_core::ops::CASH_CUSTOMER;
    use mizan_core::{PaymentMethod, SettlementMethod};
    use mizan_store::StoreConfig;

    async fn local_ledger() -> Ledger {
        let cache = StateCache::open(StoreConfig::in_memory()).await.unwrap();
        let coordinator = SyncCoordinator::start(cache, None, "test").await.unwrap();
        Ledger::new(coordinator)
    }

    fn paint(id: &str, price: i64, stock: i64) -> Product {
        Product {
            id: id.to_owned(),
            code: format!("P-{id}"),
            name: format!("Paint {id}"),
            category: "Paint".to_owned(),
            size: "1L".to_owned(),
            buy_price: Money::from_cents(price / 2),
            sell_price: Money::from_cents(price),
            quantity: stock,
            min_stock_alert: 2,
        }
    }

    fn cash_sale(product_id: &str, quantity: i64, paid: i64) -> SaleInput {
        SaleInput {
            lines: vec![ops::SaleLine {
                product_id: product_id.to_owned(),
                quantity,
            }],
            payment_method: PaymentMethod::Cash,
            paid_amount: Money::from_cents(paid),
            customer_name: None,
            employee_name: "Omar".to_owned(),
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sale_commits_and_persists() {
        let ledger = local_ledger().await;
        ledger.upsert_product(paint("p1", 1000, 10)).await.unwrap();

        let sale = ledger.process_sale(cash_sale("p1", 3, 3000)).await.unwrap();
        assert_eq!(sale.invoice_number, 1);
        assert_eq!(sale.customer_name, CASH_CUSTOMER);

        // The commit reached the cache, not just memory.
        let stored = ledger.cache().load().await.unwrap().unwrap();
        assert_eq!(stored.sales.len(), 1);
        assert_eq!(stored.products[0].quantity, 7);
    }

    #[tokio::test]
    async fn test_failed_operation_commits_nothing() {
        let ledger = local_ledger().await;
        ledger.upsert_product(paint("p1", 1000, 10)).await.unwrap();

        let result = ledger.process_sale(cash_sale("missing", 1, 1000)).await;
        assert!(result.is_err());

        let state = ledger.state().await;
        assert!(state.sales.is_empty());
        assert_eq!(state.last_invoice_number, 0);
    }

    #[tokio::test]
    async fn test_exhausted_return_commits_nothing() {
        let ledger = local_ledger().await;
        ledger.upsert_product(paint("p1", 1000, 10)).await.unwrap();
        let sale = ledger.process_sale(cash_sale("p1", 2, 2000)).await.unwrap();

        let lines = [ReturnLine {
            product_id: "p1".to_owned(),
            quantity: 2,
        }];
        let first = ledger
            .process_partial_return(&sale.id, &lines, Utc::now())
            .await
            .unwrap();
        assert_eq!(first.returned_units, 2);
        let before = ledger.state().await;

        // Everything already came back; the second attempt is a no-op.
        let second = ledger
            .process_partial_return(&sale.id, &lines, Utc::now())
            .await
            .unwrap();
        assert_eq!(second.returned_units, 0);
        assert_eq!(*ledger.state().await, *before);
    }

    #[tokio::test]
    async fn test_concurrent_collections_compose() {
        let ledger = Arc::new(local_ledger().await);
        let customer_id = ledger.find_or_create_customer("Alice").await.unwrap();
        {
            let mut customer = (*ledger.state().await).find_customer(&customer_id).unwrap().clone();
            customer.total_debt = Money::from_cents(500);
            ledger.upsert_customer(customer).await.unwrap();
        }

        // Two overlapping collections of 100 each must land on 300, not
        // 400: the second must see the first one's commit.
        let a = {
            let ledger = ledger.clone();
            let id = customer_id.clone();
            tokio::spawn(async move {
                ledger
                    .collect_customer_debt(&id, Money::from_cents(100), Utc::now())
                    .await
            })
        };
        let b = {
            let ledger = ledger.clone();
            let id = customer_id.clone();
            tokio::spawn(async move {
                ledger
                    .collect_customer_debt(&id, Money::from_cents(100), Utc::now())
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let state = ledger.state().await;
        let customer = state.find_customer(&customer_id).unwrap();
        assert_eq!(customer.total_debt, Money::from_cents(300));
    }

    #[tokio::test]
    async fn test_purchase_without_matching_product_still_books() {
        let ledger = local_ledger().await;
        ledger
            .upsert_supplier(Supplier {
                id: "s1".to_owned(),
                name: "Al Noor Paints".to_owned(),
                phone: String::new(),
                company: String::new(),
                total_debt: Money::zero(),
            })
            .await
            .unwrap();

        let outcome = ledger
            .record_purchase(PurchaseInput {
                supplier_id: "s1".to_owned(),
                item_name: "Thinner 5L".to_owned(),
                quantity: 4,
                total_cost: Money::from_cents(8000),
                paid_amount: Money::from_cents(8000),
                date: Utc::now(),
            })
            .await
            .unwrap();

        assert!(!outcome.stock_applied);
        let state = ledger.state().await;
        assert_eq!(state.purchases.len(), 1);
        assert_eq!(
            state.treasury_balance(SettlementMethod::Cash),
            Money::from_cents(-8000)
        );
    }

    #[tokio::test]
    async fn test_treasury_balance_matches_the_full_operation_sequence() {
        let ledger = local_ledger().await;
        ledger.upsert_product(paint("p1", 1000, 10)).await.unwrap();
        ledger
            .upsert_supplier(Supplier {
                id: "s1".to_owned(),
                name: "Al Noor Paints".to_owned(),
                phone: String::new(),
                company: String::new(),
                total_debt: Money::zero(),
            })
            .await
            .unwrap();
        ledger
            .upsert_employee(Employee {
                id: "e1".to_owned(),
                name: "Dana".to_owned(),
                email: String::new(),
                phone: String::new(),
                role: mizan_core::EmployeeRole::Staff,
                base_salary: Money::from_cents(3000),
            })
            .await
            .unwrap();

        // Sale of 3 units (3000), 2000 paid, 1000 on Alice's account.
        let sale = ledger
            .process_sale(SaleInput {
                customer_name: Some("Alice".to_owned()),
                ..cash_sale("p1", 3, 2000)
            })
            .await
            .unwrap();
        let alice = sale.customer_id.clone().unwrap();

        ledger
            .collect_customer_debt(&alice, Money::from_cents(500), Utc::now())
            .await
            .unwrap();
        ledger
            .record_purchase(PurchaseInput {
                supplier_id: "s1".to_owned(),
                item_name: "Paint p1".to_owned(),
                quantity: 5,
                total_cost: Money::from_cents(1700),
                paid_amount: Money::from_cents(1500),
                date: Utc::now(),
            })
            .await
            .unwrap();
        ledger
            .pay_supplier_debt("s1", Money::from_cents(200), Utc::now())
            .await
            .unwrap();
        ledger
            .pay_salary("e1", Money::zero(), Money::zero(), Utc::now())
            .await
            .unwrap();
        // Returning 1 unit (1000): 500 offsets Alice's remaining debt,
        // 500 leaves as cash.
        let outcome = ledger
            .process_partial_return(
                &sale.id,
                &[ReturnLine {
                    product_id: "p1".to_owned(),
                    quantity: 1,
                }],
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.net_refund, Money::from_cents(500));

        // Net cash: +2000 +500 -1500 -200 -3000 -500.
        let state = ledger.state().await;
        assert_eq!(
            state.treasury_balance(SettlementMethod::Cash),
            Money::from_cents(-2700)
        );
        // Every entry settles as Cash, so the total agrees.
        assert_eq!(state.treasury_total(), Money::from_cents(-2700));
    }

    #[tokio::test]
    async fn test_committed_sale_replicates() {
        let cache = StateCache::open(StoreConfig::in_memory()).await.unwrap();
        let replica = Arc::new(MemoryReplica::new());
        let coordinator = SyncCoordinator::start(cache, Some(replica.clone()), "shop")
            .await
            .unwrap();
        let ledger = Ledger::new(coordinator);

        ledger.upsert_product(paint("p1", 1000, 10)).await.unwrap();
        ledger.process_sale(cash_sale("p1", 1, 1000)).await.unwrap();

        // The remote push is asynchronous; poll for it.
        let mut replicated = false;
        for _ in 0..100 {
            if let Some(doc) = replica.get("shop").await.unwrap() {
                if doc.sales.len() == 1 {
                    replicated = true;
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(replicated, "sale never reached the remote replica");
    }

    #[tokio::test]
    async fn test_product_with_bad_code_is_rejected() {
        let ledger = local_ledger().await;
        let mut product = paint("p1", 1000, 10);
        product.code = "no spaces allowed".to_owned();

        let err = ledger.upsert_product(product).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Ledger(mizan_core::LedgerError::Validation(_))
        ));
        assert!(ledger.state().await.products.is_empty());
    }

    #[tokio::test]
    async fn test_summary_uses_fallback_on_failure() {
        let ledger = local_ledger().await;
        ledger.upsert_product(paint("p1", 1000, 10)).await.unwrap();
        ledger.process_sale(cash_sale("p1", 2, 2000)).await.unwrap();

        let text = ledger.summary(&mizan_core::FallbackSummarizer).await;
        assert!(text.contains("1 invoices"));
    }
}
