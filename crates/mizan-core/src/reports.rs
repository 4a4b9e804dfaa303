//! Sales aggregates and the optional text summarization seam.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::state::State;

/// Headline numbers over the sales history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesAggregates {
    /// Gross sale value across invoices (returned units excluded).
    pub total_sales: Money,
    pub invoice_count: u64,
    /// Margin on units that stayed sold: Σ unreturned × (sell − buy).
    pub net_profit: Money,
}

impl SalesAggregates {
    /// Computes aggregates over the full sales log.
    ///
    /// Returned units count toward neither revenue nor profit; both are
    /// measured per line from the prices frozen at sale time, so later
    /// product price edits never rewrite past performance.
    pub fn from_state(state: &State) -> Self {
        let mut total_sales = Money::zero();
        let mut net_profit = Money::zero();
        for sale in &state.sales {
            for item in &sale.items {
                let kept = item.remaining_quantity();
                total_sales += item.sell_price.multiply_quantity(kept);
                net_profit += (item.sell_price - item.buy_price).multiply_quantity(kept);
            }
        }
        SalesAggregates {
            total_sales,
            invoice_count: state.sales.len() as u64,
            net_profit,
        }
    }
}

/// Turns aggregate numbers into prose. Purely informational; the
/// implementation may call out to anything (or nothing).
pub trait Summarizer {
    type Error: std::fmt::Display;

    fn summarize(&self, aggregates: &SalesAggregates) -> Result<String, Self::Error>;

    /// Summarizes without ever failing: on error the canned fallback
    /// message is returned instead.
    fn summarize_or_fallback(&self, aggregates: &SalesAggregates) -> String {
        self.summarize(aggregates)
            .unwrap_or_else(|_| fallback_summary(aggregates))
    }
}

/// The no-dependency summarizer: always the canned message.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSummarizer;

impl Summarizer for FallbackSummarizer {
    type Error = std::convert::Infallible;

    fn summarize(&self, aggregates: &SalesAggregates) -> Result<String, Self::Error> {
        Ok(fallback_summary(aggregates))
    }
}

fn fallback_summary(aggregates: &SalesAggregates) -> String {
    format!(
        "{} invoices, {} in sales, {} net profit.",
        aggregates.invoice_count, aggregates.total_sales, aggregates.net_profit
    )
}

// ============================================================================
// Tests
// ============================================================================
